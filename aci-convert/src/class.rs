//! The closed vocabulary of MIT object classes the model builder understands.

use std::fmt::{self, Display, Formatter};

/// A recognized object class, or the raw name of one that is not recognized.
///
/// Ingestion matches on this enum rather than on strings so every handled
/// class is listed in exactly one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MitClass {
    PolUni,
    // fabric
    FabricInst,
    CtrlrInst,
    FabricProtPol,
    FabricNodeIdentPol,
    FabricNodeIdentP,
    FabricExplicitGEp,
    FabricNodePEp,
    FabricInterface,
    L1PhysIf,
    // tenant
    FvTenant,
    FvCtx,
    FvBD,
    FvRsCtx,
    FvSubnet,
    FvRsPathAtt,
    FvAp,
    FvAEPg,
    FvRsBd,
    FvRsProv,
    FvRsCons,
    FvRsProvIf,
    FvRsConsIf,
    FvRsProtBy,
    // contracts
    VzBrCP,
    VzTaboo,
    VzSubj,
    VzRsSubjFiltAtt,
    VzFilter,
    VzEntry,
    VzCPIf,
    // external connectivity
    L3extOut,
    L3extRsEctx,
    L3extInstP,
    L3extSubnet,
    L3extLNodeP,
    L3extLIfP,
    L3extRsPathL3OutAtt,
    L3extRsNodeL3OutAtt,
    IpRouteP,
    IpNexthopP,
    BgpExtP,
    BgpPeerP,
    BgpAsP,
    BgpLocalAsnP,
    OspfExtP,
    OspfIfP,
    L2extOut,
    L2extRsEBd,
    // management
    MgmtMgmtP,
    MgmtOoB,
    MgmtRsOoBStNode,
    // companion topology document
    FabricLink,
    /// Any class outside the vocabulary; the raw name is kept for warnings.
    Unrecognized(String),
}

impl MitClass {
    /// Map a raw class name onto the vocabulary.
    ///
    /// Capitalization variants seen in real exports (`l3ExtOut`, `vzTSubj`,
    /// ...) fold onto their canonical class.
    pub fn from_name(name: &str) -> Self {
        match name {
            "polUni" => Self::PolUni,
            "fabricInst" => Self::FabricInst,
            "ctrlrInst" => Self::CtrlrInst,
            "fabricProtPol" => Self::FabricProtPol,
            "fabricNodeIdentPol" => Self::FabricNodeIdentPol,
            "fabricNodeIdentP" => Self::FabricNodeIdentP,
            "fabricExplicitGEp" => Self::FabricExplicitGEp,
            "fabricNodePEp" => Self::FabricNodePEp,
            "fabricInterface" => Self::FabricInterface,
            "l1PhysIf" => Self::L1PhysIf,
            "fvTenant" => Self::FvTenant,
            "fvCtx" => Self::FvCtx,
            "fvBD" => Self::FvBD,
            "fvRsCtx" => Self::FvRsCtx,
            "fvSubnet" => Self::FvSubnet,
            "fvRsPathAtt" => Self::FvRsPathAtt,
            "fvAp" => Self::FvAp,
            "fvAEPg" => Self::FvAEPg,
            "fvRsBd" => Self::FvRsBd,
            "fvRsProv" => Self::FvRsProv,
            "fvRsCons" => Self::FvRsCons,
            "fvRsProvIf" => Self::FvRsProvIf,
            "fvRsConsIf" => Self::FvRsConsIf,
            "fvRsProtBy" => Self::FvRsProtBy,
            "vzBrCP" => Self::VzBrCP,
            "vzTaboo" => Self::VzTaboo,
            "vzSubj" | "vzTSubj" => Self::VzSubj,
            "vzRsSubjFiltAtt" | "vzRsTSubjFiltAtt" | "vzRsDenyRule" => Self::VzRsSubjFiltAtt,
            "vzFilter" => Self::VzFilter,
            "vzEntry" => Self::VzEntry,
            "vzCPIf" => Self::VzCPIf,
            "l3extOut" | "l3ExtOut" => Self::L3extOut,
            "l3extRsEctx" => Self::L3extRsEctx,
            "l3extInstP" | "l3ExtInstP" => Self::L3extInstP,
            "l3extSubnet" | "l3ExtSubnet" => Self::L3extSubnet,
            "l3extLNodeP" => Self::L3extLNodeP,
            "l3extLIfP" => Self::L3extLIfP,
            "l3extRsPathL3OutAtt" => Self::L3extRsPathL3OutAtt,
            "l3extRsNodeL3OutAtt" => Self::L3extRsNodeL3OutAtt,
            "ipRouteP" => Self::IpRouteP,
            "ipNexthopP" => Self::IpNexthopP,
            "bgpExtP" => Self::BgpExtP,
            "bgpPeerP" => Self::BgpPeerP,
            "bgpAsP" => Self::BgpAsP,
            "bgpLocalAsnP" => Self::BgpLocalAsnP,
            "ospfExtP" => Self::OspfExtP,
            "ospfIfP" => Self::OspfIfP,
            "l2extOut" | "l2ExtOut" => Self::L2extOut,
            "l2extRsEBd" => Self::L2extRsEBd,
            "mgmtMgmtP" => Self::MgmtMgmtP,
            "mgmtOoB" => Self::MgmtOoB,
            "mgmtRsOoBStNode" => Self::MgmtRsOoBStNode,
            "fabricLink" => Self::FabricLink,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Canonical class name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::PolUni => "polUni",
            Self::FabricInst => "fabricInst",
            Self::CtrlrInst => "ctrlrInst",
            Self::FabricProtPol => "fabricProtPol",
            Self::FabricNodeIdentPol => "fabricNodeIdentPol",
            Self::FabricNodeIdentP => "fabricNodeIdentP",
            Self::FabricExplicitGEp => "fabricExplicitGEp",
            Self::FabricNodePEp => "fabricNodePEp",
            Self::FabricInterface => "fabricInterface",
            Self::L1PhysIf => "l1PhysIf",
            Self::FvTenant => "fvTenant",
            Self::FvCtx => "fvCtx",
            Self::FvBD => "fvBD",
            Self::FvRsCtx => "fvRsCtx",
            Self::FvSubnet => "fvSubnet",
            Self::FvRsPathAtt => "fvRsPathAtt",
            Self::FvAp => "fvAp",
            Self::FvAEPg => "fvAEPg",
            Self::FvRsBd => "fvRsBd",
            Self::FvRsProv => "fvRsProv",
            Self::FvRsCons => "fvRsCons",
            Self::FvRsProvIf => "fvRsProvIf",
            Self::FvRsConsIf => "fvRsConsIf",
            Self::FvRsProtBy => "fvRsProtBy",
            Self::VzBrCP => "vzBrCP",
            Self::VzTaboo => "vzTaboo",
            Self::VzSubj => "vzSubj",
            Self::VzRsSubjFiltAtt => "vzRsSubjFiltAtt",
            Self::VzFilter => "vzFilter",
            Self::VzEntry => "vzEntry",
            Self::VzCPIf => "vzCPIf",
            Self::L3extOut => "l3extOut",
            Self::L3extRsEctx => "l3extRsEctx",
            Self::L3extInstP => "l3extInstP",
            Self::L3extSubnet => "l3extSubnet",
            Self::L3extLNodeP => "l3extLNodeP",
            Self::L3extLIfP => "l3extLIfP",
            Self::L3extRsPathL3OutAtt => "l3extRsPathL3OutAtt",
            Self::L3extRsNodeL3OutAtt => "l3extRsNodeL3OutAtt",
            Self::IpRouteP => "ipRouteP",
            Self::IpNexthopP => "ipNexthopP",
            Self::BgpExtP => "bgpExtP",
            Self::BgpPeerP => "bgpPeerP",
            Self::BgpAsP => "bgpAsP",
            Self::BgpLocalAsnP => "bgpLocalAsnP",
            Self::OspfExtP => "ospfExtP",
            Self::OspfIfP => "ospfIfP",
            Self::L2extOut => "l2extOut",
            Self::L2extRsEBd => "l2extRsEBd",
            Self::MgmtMgmtP => "mgmtMgmtP",
            Self::MgmtOoB => "mgmtOoB",
            Self::MgmtRsOoBStNode => "mgmtRsOoBStNode",
            Self::FabricLink => "fabricLink",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl Display for MitClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a raw node.
pub fn class_of(node: &mit_tree::MitNode) -> MitClass {
    MitClass::from_name(&node.class)
}
