use std::collections::BTreeMap;

use super::{
    AciModel, ApplicationProfile, BridgeDomain, Contract, ContractInterface, Epg, FabricNode,
    Filter, L2Out, L3Out, PathAttachment, Tenant, VpcPair, Vrf,
};

/// Growable state used while walking one export.
///
/// Nothing outside ingestion sees this type; [`ModelBuilder::freeze`] turns it
/// into the read-only [`AciModel`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    pub(crate) hostname: String,
    pub(crate) node_names: BTreeMap<String, String>,
    pub(crate) tenants: BTreeMap<String, Tenant>,
    pub(crate) vrfs: BTreeMap<String, Vrf>,
    pub(crate) bridge_domains: BTreeMap<String, BridgeDomain>,
    pub(crate) application_profiles: BTreeMap<String, ApplicationProfile>,
    pub(crate) epgs: BTreeMap<String, Epg>,
    pub(crate) contracts: BTreeMap<String, Contract>,
    pub(crate) taboo_contracts: BTreeMap<String, Contract>,
    pub(crate) contract_interfaces: BTreeMap<String, ContractInterface>,
    pub(crate) filters: BTreeMap<String, Filter>,
    pub(crate) fabric_nodes: BTreeMap<String, FabricNode>,
    pub(crate) vpc_pairs: BTreeMap<String, VpcPair>,
    pub(crate) l3outs: BTreeMap<String, L3Out>,
    pub(crate) l2outs: BTreeMap<String, L2Out>,
    pub(crate) path_attachments: BTreeMap<String, BTreeMap<String, PathAttachment>>,
    pub(crate) node_interfaces: BTreeMap<String, Vec<String>>,
}

impl ModelBuilder {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Record a node name unless a non-empty one is already known.
    pub(crate) fn offer_node_name(&mut self, node_id: &str, name: &str) {
        if name.is_empty() {
            return;
        }
        let slot = self.node_names.entry(node_id.to_string()).or_default();
        if slot.is_empty() {
            *slot = name.to_string();
        }
    }

    pub(crate) fn tenant_mut(&mut self, name: &str) -> &mut Tenant {
        self.tenants
            .entry(name.to_string())
            .or_insert_with(|| Tenant {
                name: name.to_string(),
                ..Tenant::default()
            })
    }

    pub(crate) fn add_vrf(&mut self, fq: String, vrf: Vrf) {
        self.tenant_mut(&vrf.tenant).vrfs.insert(fq.clone());
        self.vrfs.insert(fq, vrf);
    }

    pub(crate) fn add_bridge_domain(&mut self, fq: String, bd: BridgeDomain) {
        self.tenant_mut(&bd.tenant).bridge_domains.insert(fq.clone());
        self.bridge_domains.insert(fq, bd);
    }

    pub(crate) fn add_application_profile(&mut self, fq: String, ap: ApplicationProfile) {
        self.tenant_mut(&ap.tenant)
            .application_profiles
            .insert(fq.clone());
        self.application_profiles.insert(fq, ap);
    }

    pub(crate) fn add_epg(&mut self, fq: String, epg: Epg) {
        self.tenant_mut(&epg.tenant).epgs.insert(fq.clone());
        self.epgs.insert(fq, epg);
    }

    pub(crate) fn add_contract(&mut self, fq: String, contract: Contract) {
        self.tenant_mut(&contract.tenant)
            .contracts
            .insert(fq.clone());
        self.contracts.insert(fq, contract);
    }

    pub(crate) fn add_taboo(&mut self, fq: String, taboo: Contract) {
        self.tenant_mut(&taboo.tenant)
            .taboo_contracts
            .insert(fq.clone());
        self.taboo_contracts.insert(fq, taboo);
    }

    pub(crate) fn add_contract_interface(&mut self, fq: String, cif: ContractInterface) {
        self.tenant_mut(&cif.tenant)
            .contract_interfaces
            .insert(fq.clone());
        self.contract_interfaces.insert(fq, cif);
    }

    pub(crate) fn add_filter(&mut self, fq: String, filter: Filter) {
        self.tenant_mut(&filter.tenant).filters.insert(fq.clone());
        self.filters.insert(fq, filter);
    }

    pub(crate) fn add_l3out(&mut self, fq: String, l3out: L3Out) {
        self.tenant_mut(&l3out.tenant).l3outs.insert(fq.clone());
        self.l3outs.insert(fq, l3out);
    }

    pub(crate) fn add_l2out(&mut self, fq: String, l2out: L2Out) {
        self.tenant_mut(&l2out.tenant).l2outs.insert(fq.clone());
        self.l2outs.insert(fq, l2out);
    }

    /// Index a path attachment under every node it lands on.
    pub(crate) fn index_path_attachment(&mut self, attachment: &PathAttachment) {
        let iface = attachment.target.interface.clone();
        for node_id in attachment.target.node_ids() {
            self.path_attachments
                .entry(node_id.to_string())
                .or_default()
                .insert(iface.clone(), attachment.clone());

            let seen = self.node_interfaces.entry(node_id.to_string()).or_default();
            if !seen.contains(&iface) {
                seen.push(iface.clone());
            }
        }
    }

    /// Finish construction. The returned model cannot be mutated.
    pub fn freeze(self) -> AciModel {
        AciModel {
            hostname: self.hostname,
            tenants: self.tenants,
            vrfs: self.vrfs,
            bridge_domains: self.bridge_domains,
            application_profiles: self.application_profiles,
            epgs: self.epgs,
            contracts: self.contracts,
            taboo_contracts: self.taboo_contracts,
            contract_interfaces: self.contract_interfaces,
            filters: self.filters,
            fabric_nodes: self.fabric_nodes,
            vpc_pairs: self.vpc_pairs,
            l3outs: self.l3outs,
            l2outs: self.l2outs,
            fabric_links: Vec::new(),
            path_attachments: self.path_attachments,
            node_interfaces: self.node_interfaces,
        }
    }
}
