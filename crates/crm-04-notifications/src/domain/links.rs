//! Absolute links into the back office.
//!
//! Paths come from the shared route table and are joined onto the configured
//! origin, so a link can only point at a route the gateway serves.

use crate::domain::errors::LinkError;
use crm_types::routes::{self, reverse};
use crm_types::{BudgetReference, LeadId};
use url::Url;

/// Builds absolute URLs on a fixed public origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    base: Url,
}

impl LinkBuilder {
    /// `origin` must be absolute http(s). A path prefix is kept.
    pub fn parse(origin: &str) -> Result<Self, LinkError> {
        let mut base =
            Url::parse(origin.trim()).map_err(|e| LinkError::InvalidOrigin(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(LinkError::InvalidOrigin(origin.to_string()));
        }
        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn origin(&self) -> &Url {
        &self.base
    }

    /// Link to a lead's back-office record.
    pub fn lead(&self, id: LeadId) -> Result<Url, LinkError> {
        let id = id.to_string();
        self.route(routes::OFFICE_LEAD, &[("id", &id)])
    }

    /// Link to a budget.
    pub fn budget(&self, reference: &BudgetReference) -> Result<Url, LinkError> {
        self.route(routes::OFFICE_BUDGET, &[("reference", reference.as_str())])
    }

    fn route(&self, template: &'static str, params: &[(&str, &str)]) -> Result<Url, LinkError> {
        let path = reverse(template, params)?;
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| LinkError::Join(e.to_string()))
    }
}
