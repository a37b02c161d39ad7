//! Conversion between database rows and domain models.

use std::collections::BTreeMap;

use lb_model::{Account, Identity, UsageRecord};

use crate::entities::{AccountRow, IdentityRow, UsageRow};

pub fn account_from_rows(row: AccountRow, identities: Vec<IdentityRow>) -> Account {
    let identities: BTreeMap<String, Identity> = identities
        .into_iter()
        .map(|identity| {
            (
                identity.provider_id,
                Identity {
                    id: identity.external_id,
                    name: identity.name,
                    username: identity.username,
                    uri: identity.uri,
                },
            )
        })
        .collect();

    Account {
        id: row.id,
        uri: row.uri,
        name: row.name,
        identities,
        merged_from: row.merged_from,
    }
}

pub fn usage_from_row(row: UsageRow) -> UsageRecord {
    UsageRecord {
        account_id: row.account_id,
        created_at: row.created_at,
        last_used_at: row.last_used_at,
    }
}
