use log::{debug, info};

use crate::config::*;
use crate::records::RecordSet;

/// Locates the columns of each role in a (merged) record set.
///
/// In positional mode, the first four columns are time, identity, amount and
/// group. In fuzzy mode, each role is bound to the first header that contains
/// all the fragments listed for it in `roles`. A missing time column is
/// accepted; any other missing role is reported at once.
pub fn resolve(
    records: &RecordSet,
    mode: ResolveMode,
    roles: &RoleTable,
) -> Result<ResolvedColumns, SchemaError> {
    let headers = records.headers();
    debug!("resolve: mode: {:?} headers: {:?}", mode, headers);
    match mode {
        ResolveMode::Positional => {
            if headers.len() < 4 {
                return Err(SchemaError::TooFewColumns {
                    found: headers.len(),
                });
            }
            Ok(ResolvedColumns {
                time: Some(0),
                identity: 1,
                amount: 2,
                group: 3,
            })
        }
        ResolveMode::FuzzyName => {
            let find = |role: Role| find_column(headers, roles.required(role));
            let missing: Vec<Role> = Role::MANDATORY
                .iter()
                .filter(|role| find(**role).is_none())
                .cloned()
                .collect();
            match (find(Role::Identity), find(Role::Amount), find(Role::Group)) {
                (Some(identity), Some(amount), Some(group)) => {
                    let res = ResolvedColumns {
                        time: find(Role::Time),
                        identity,
                        amount,
                        group,
                    };
                    info!("resolve: columns found: {:?}", res);
                    Ok(res)
                }
                _ => Err(SchemaError::MissingRoles(missing)),
            }
        }
    }
}

/// The first header containing every one of the fragments.
///
/// An empty list of fragments matches nothing.
pub fn find_column(headers: &[String], fragments: &[String]) -> Option<usize> {
    if fragments.is_empty() {
        return None;
    }
    headers
        .iter()
        .position(|h| fragments.iter().all(|f| h.contains(f.as_str())))
}
