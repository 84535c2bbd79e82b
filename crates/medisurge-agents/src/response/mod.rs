//! Reference response agents, one per [`AgentName`](medisurge_types::AgentName).

mod communication;
mod insurance;
mod resource;
mod staff;
mod supply_chain;

pub use communication::{advisory_text, AdvisoryCampaign, CommunicationAgent, Distribution};
pub use insurance::{Authorization, InsuranceAgent, PreAuthorization, Treatment};
pub use resource::{AllocationStrategy, ResourceAgent, ResourcePlan};
pub use staff::{
    Activation, ActivationStatus, RetiredClinician, Specialization, StaffActivation,
    StaffActivationAgent,
};
pub use supply_chain::{
    requirements_for, HospitalInventory, MedicineStock, PartnerAlert, Requirement, StockStatus,
    SupplyChainAgent, SupplyForecast,
};
