//! Host id to network endpoint lookup.

use crate::config::HostEndpoint;
use crate::error::PartitionError;
use indexmap::IndexMap;
use tessel_core::{ConnectionInfo, ConnectionPurpose, HandoffState, HostId};

/// The hosts of a deployment, in configuration order.
#[derive(Clone, Debug, Default)]
pub struct HostDirectory {
    hosts: IndexMap<HostId, HostEndpoint>,
}

impl HostDirectory {
    /// Index `endpoints`, rejecting repeated ids.
    pub fn new(endpoints: &[HostEndpoint]) -> Result<Self, PartitionError> {
        let mut hosts = IndexMap::with_capacity(endpoints.len());
        for ep in endpoints {
            if hosts.insert(ep.id, ep.clone()).is_some() {
                return Err(PartitionError::DuplicateHost { host: ep.id });
            }
        }
        Ok(Self { hosts })
    }

    /// Endpoint of `host`, if configured.
    pub fn endpoint(&self, host: HostId) -> Option<&HostEndpoint> {
        self.hosts.get(&host)
    }

    /// Whether `host` is configured.
    pub fn contains(&self, host: HostId) -> bool {
        self.hosts.contains_key(&host)
    }

    /// Number of hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether no hosts are configured.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Iterate hosts in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &HostEndpoint> {
        self.hosts.values()
    }

    /// Connection details pointing a client at `host`.
    pub fn connection_info(
        &self,
        host: HostId,
        purpose: ConnectionPurpose,
        carried: Option<HandoffState>,
    ) -> Option<ConnectionInfo> {
        self.endpoint(host).map(|ep| ConnectionInfo {
            host,
            address: ep.address.clone(),
            port: ep.port,
            purpose,
            carried,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(id: u32) -> HostEndpoint {
        HostEndpoint {
            id: HostId(id),
            address: format!("10.0.0.{id}"),
            port: 9000 + id as u16,
        }
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = HostDirectory::new(&[ep(1), ep(2), ep(1)]).unwrap_err();
        assert_eq!(err, PartitionError::DuplicateHost { host: HostId(1) });
    }

    #[test]
    fn connection_info_uses_endpoint() {
        let dir = HostDirectory::new(&[ep(1), ep(2)]).unwrap();
        let info = dir
            .connection_info(HostId(2), ConnectionPurpose::Handoff, None)
            .unwrap();
        assert_eq!(info.address, "10.0.0.2");
        assert_eq!(info.port, 9002);
        assert!(dir.connection_info(HostId(7), ConnectionPurpose::Handoff, None).is_none());
    }
}
