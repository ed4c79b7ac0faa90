//! Battery and connection decorators.

use async_trait::async_trait;

use crate::capability::{BatteryProvider, BatteryStatus, ConnectionInfo, NetworkProvider};
use crate::error::Result;
use crate::registry::{member, OverrideRegistry, Surface};

/// Keeps the native battery call and rewrites the resolved manager.
pub struct ProfileBattery {
    inner: Box<dyn BatteryProvider>,
    level: Option<f64>,
    charging: Option<bool>,
}

impl ProfileBattery {
    pub fn new(inner: Box<dyn BatteryProvider>, level: Option<f64>, charging: Option<bool>) -> Self {
        Self {
            inner,
            level,
            charging,
        }
    }
}

#[async_trait(?Send)]
impl BatteryProvider for ProfileBattery {
    async fn get_battery(&self) -> Result<BatteryStatus> {
        let mut status = self.inner.get_battery().await?;
        if let Some(level) = self.level {
            status.level = level;
        }
        if let Some(charging) = self.charging {
            status.charging = charging;
        }
        Ok(status)
    }
}

pub struct ProfileNetwork {
    inner: Box<dyn NetworkProvider>,
    effective_type: Option<String>,
    downlink: Option<f64>,
    rtt: Option<f64>,
}

impl ProfileNetwork {
    pub fn new(inner: Box<dyn NetworkProvider>, registry: &OverrideRegistry) -> Self {
        let conn = |m| registry.value(Surface::Connection, m);
        Self {
            inner,
            effective_type: conn(member::EFFECTIVE_TYPE).and_then(|v| v.as_text()).map(String::from),
            downlink: conn(member::DOWNLINK).and_then(|v| v.as_number()),
            rtt: conn(member::RTT).and_then(|v| v.as_number()),
        }
    }
}

impl NetworkProvider for ProfileNetwork {
    // No descriptor is synthesized where the platform has none.
    fn connection(&self) -> Option<ConnectionInfo> {
        let mut info = self.inner.connection()?;
        if let Some(effective_type) = &self.effective_type {
            info.effective_type = effective_type.clone();
        }
        if let Some(downlink) = self.downlink {
            info.downlink = downlink;
        }
        if let Some(rtt) = self.rtt {
            info.rtt = rtt;
        }
        Some(info)
    }
}
