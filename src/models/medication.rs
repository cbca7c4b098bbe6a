use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Frequency;
use crate::schedule::ScheduleRuleSet;

/// A medication owned by one user.
///
/// The schedule core only ever reads the embedded rule set; create/update/
/// delete flows go through the repository. `stock` is a plain count in
/// `stock_unit`s, absent when the user does not track inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub alias: Option<String>,
    pub category: Option<String>,
    pub form: Option<String>,
    pub specification: Option<String>,
    pub stock: Option<u32>,
    pub stock_unit: String,
    pub default_dose: f64,
    pub dose_unit: String,
    pub frequency: Frequency,
    pub schedule: ScheduleRuleSet,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

impl Medication {
    /// A new active medication with an empty schedule and the defaults the
    /// add-medication flow starts from.
    pub fn new(user_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            alias: None,
            category: None,
            form: None,
            specification: None,
            stock: None,
            stock_unit: "tablet".to_string(),
            default_dose: 1.0,
            dose_unit: "tablet".to_string(),
            frequency: Frequency::Daily,
            schedule: ScheduleRuleSet::new(),
            image_url: None,
            notes: None,
            is_active: true,
        }
    }
}
