//! Strategy criteria port trait.

use crate::domain::criteria::Criteria;
use crate::domain::error::TraderError;

pub trait CriteriaSource {
    /// Buy and sell criteria of the strategy called `name`.
    fn load_criteria(&self, name: &str) -> Result<Criteria, TraderError>;

    fn list_strategies(&self) -> Result<Vec<String>, TraderError>;
}
