//! Hospital registration: a participant joins the federation.

use corechain_types::HospitalId;
use serde::{Deserialize, Serialize};

/// A hospital counts as registered once at least one of these is sealed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HospitalRegistrationTx {
    pub hospital_id: HospitalId,
    pub hospital_name: String,
    /// Number of local training examples the hospital declares.
    pub dataset_size: u64,
    pub dataset_type: String,
}
