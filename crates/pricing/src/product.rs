use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use destore_core::{DomainError, DomainResult, Entity, ProductId};

/// A sellable product. The SKU is assigned at creation and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    description: Option<String>,
    category: Option<String>,
    active: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: create a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Command: update the mutable product fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub active: Option<bool>,
}

impl Product {
    /// Validate a creation command and build the first snapshot.
    ///
    /// SKU uniqueness is a storage concern and is checked by the caller.
    pub fn create(cmd: &NewProduct, at: DateTime<Utc>) -> DomainResult<Self> {
        let sku = cmd.sku.trim();
        if sku.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id: ProductId::new(),
            sku: sku.to_string(),
            name: cmd.name.trim().to_string(),
            description: cmd.description.clone(),
            category: cmd.category.clone(),
            active: true,
            version: 1,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn update(&self, update: &ProductUpdate, at: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            next.name = name.trim().to_string();
        }
        if let Some(description) = &update.description {
            next.description = Some(description.clone());
        }
        if let Some(category) = &update.category {
            next.category = Some(category.clone());
        }
        if let Some(active) = update.active {
            next.active = active;
        }

        next.version += 1;
        next.updated_at = at;
        Ok(next)
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
