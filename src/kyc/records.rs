//! Records stored in the KYC registry.
use serde::{Deserialize, Serialize};

/// Identifies an organization. Embedded by value in customer and bank records.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrgCredentials {
    /// Human readable organization name, compared against caller identities.
    org_name: String,

    /// Organization number.
    org_num: i64,
}

impl OrgCredentials {
    /// Creates credentials for the named organization.
    pub fn new(org_name: impl Into<String>, org_num: i64) -> Self {
        OrgCredentials {
            org_name: org_name.into(),
            org_num,
        }
    }

    /// Gets the organization name.
    pub fn get_org_name(&self) -> &str {
        &self.org_name
    }

    /// Gets the organization number.
    pub fn get_org_num(&self) -> i64 {
        self.org_num
    }
}

/// One onboarded individual.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    name: String,
    date_of_birth: String,
    address: String,

    /// Externally supplied identifying number. This is not the ledger key and
    /// may repeat across records.
    id_number: i64,

    phone_number: String,

    /// The organization that performed the registration.
    registered_by: OrgCredentials,
}

impl CustomerData {
    /// Gets the customer's name.
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Gets the external identifying number.
    pub fn get_id_number(&self) -> i64 {
        self.id_number
    }

    /// Gets the credentials of the registering organization.
    pub fn get_registered_by(&self) -> &OrgCredentials {
        &self.registered_by
    }

    #[cfg(test)]
    pub fn new(name: &str, id_number: i64, registered_by: OrgCredentials) -> Self {
        CustomerData {
            name: name.to_string(),
            date_of_birth: "1990-01-01".to_string(),
            address: "1 Main Street".to_string(),
            id_number,
            phone_number: "+1-555-0100".to_string(),
            registered_by,
        }
    }
}

/// One financial institution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BankData {
    name: String,

    /// Institution identifier.
    id_number: i64,

    /// The institution's own organizational credentials.
    org_credentials: OrgCredentials,
}

impl BankData {
    /// Gets the institution name.
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Gets the institution's credentials.
    pub fn get_org_credentials(&self) -> &OrgCredentials {
        &self.org_credentials
    }

    #[cfg(test)]
    pub fn new(name: &str, id_number: i64, org_credentials: OrgCredentials) -> Self {
        BankData {
            name: name.to_string(),
            id_number,
            org_credentials,
        }
    }
}
