//! Network Monitoring Abstraction
//!
//! Provides network connectivity and status information.

use crate::error::Result;

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// Cellular/mobile data connection
    Cellular,
    /// WiFi connection
    WiFi,
    /// Ethernet connection
    Ethernet,
    /// Other or unknown connection type
    Other,
}

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Connected to network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
}

/// Network monitor trait
///
/// Lets the core refuse to start a sync while the device is offline instead of
/// failing halfway through with transport errors.
///
/// # Platform Support
///
/// - **Desktop**: TCP reachability probe
/// - **iOS**: Network framework
/// - **Android**: ConnectivityManager
/// - **Web**: `navigator.onLine`
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn can_sync(monitor: &dyn NetworkMonitor) -> bool {
///     monitor.is_connected().await
/// }
/// ```
#[async_trait::async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network information
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently connected to any network
    ///
    /// `Indeterminate` counts as connected: only a definite "disconnected"
    /// answer should stop work from being attempted.
    async fn is_connected(&self) -> bool {
        !matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                status: NetworkStatus::Disconnected,
                ..
            })
        )
    }

    /// Check if connection is metered
    async fn is_metered(&self) -> bool {
        matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                is_metered: true,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    struct FixedMonitor(Option<NetworkStatus>);

    #[async_trait::async_trait]
    impl NetworkMonitor for FixedMonitor {
        async fn get_network_info(&self) -> Result<NetworkInfo> {
            match self.0 {
                Some(status) => Ok(NetworkInfo {
                    status,
                    network_type: Some(NetworkType::WiFi),
                    is_metered: false,
                }),
                None => Err(BridgeError::NotAvailable("network info".to_string())),
            }
        }
    }

    #[core_async::test]
    async fn test_is_connected_defaults() {
        assert!(FixedMonitor(Some(NetworkStatus::Connected)).is_connected().await);
        assert!(FixedMonitor(Some(NetworkStatus::Indeterminate)).is_connected().await);
        assert!(!FixedMonitor(Some(NetworkStatus::Disconnected)).is_connected().await);
        // A failing probe does not block work.
        assert!(FixedMonitor(None).is_connected().await);
    }

    #[core_async::test]
    async fn test_is_metered_default() {
        assert!(!FixedMonitor(Some(NetworkStatus::Connected)).is_metered().await);
    }
}
