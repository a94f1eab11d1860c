//! Soft-delete submit interceptor.

use crate::{EntityFields, Error, MissingFlag, Result, RoleOracle, SoftDeleteConfig};
use storage::{ChangeSet, CommitSummary, ModificationAction, PersistenceSession};
use tokio_util::sync::CancellationToken;

/// Outcome of a successful submit.
#[derive(Debug)]
pub struct SubmitResult {
    /// The committed change-set, in its original order.
    pub changes: ChangeSet,
    /// Rows written by the persistence session.
    pub summary: CommitSummary,
    /// Removes that were turned into flagged updates.
    pub soft_deleted: usize,
}

/// Turns removes into flagged updates before committing a change-set.
///
/// Callers in the configured admin role bypass the rewrite and delete for
/// real. The interceptor holds no mutable state, so one instance can serve
/// concurrent submits.
#[derive(Debug)]
pub struct SubmitInterceptor {
    config: SoftDeleteConfig,
    fields: EntityFields,
}

impl SubmitInterceptor {
    /// Build an interceptor, failing fast on invalid configuration.
    ///
    /// With [`MissingFlag::Reject`], every resource type in `fields` must
    /// declare the flag field.
    pub fn new(config: SoftDeleteConfig, fields: EntityFields) -> Result<Self> {
        config.validate()?;

        if config.missing_flag == MissingFlag::Reject {
            let flag = &config.flag_property_name;
            if let Some(resource_type) = fields.resource_types().find(|t| !fields.has(t, flag)) {
                return Err(Error::Configuration(format!(
                    "resource type '{resource_type}' does not declare soft-delete field '{flag}'"
                )));
            }
        }

        Ok(Self { config, fields })
    }

    /// Run one submit: admin check, remove rewrite, then a single commit.
    ///
    /// Persistence errors are returned unchanged; a flag set during rewrite
    /// is not reverted if the commit fails.
    pub async fn execute<S: PersistenceSession>(
        &self,
        session: &S,
        caller: &dyn RoleOracle,
        mut changes: ChangeSet,
        cancel: &CancellationToken,
    ) -> Result<SubmitResult> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let soft_deleted = if self.is_admin(caller) {
            tracing::info!(
                "Admin caller, committing {} removes as hard deletes",
                changes.count(ModificationAction::Remove)
            );
            0
        } else {
            self.rewrite(session, &mut changes)?
        };

        let summary = session.commit(&changes, cancel).await?;
        Ok(SubmitResult {
            changes,
            summary,
            soft_deleted,
        })
    }

    fn is_admin(&self, caller: &dyn RoleOracle) -> bool {
        self.config
            .admin_role()
            .is_some_and(|role| caller.is_in_role(role))
    }

    fn rewrite<S: PersistenceSession>(&self, session: &S, changes: &mut ChangeSet) -> Result<usize> {
        let flag = self.config.flag_property_name.as_str();

        // Reject before touching any entity so a refused submit leaves them as they were.
        if self.config.missing_flag == MissingFlag::Reject {
            for modification in changes.iter() {
                let resource_type = modification.entity.resource_type();
                if modification.action == ModificationAction::Remove && !self.fields.has(&resource_type, flag) {
                    return Err(Error::MissingSoftDeleteField {
                        resource_type,
                        field: flag.to_string(),
                    });
                }
            }
        }

        let mut rewritten = 0;
        for modification in changes.iter_mut() {
            if modification.action != ModificationAction::Remove {
                continue;
            }

            let resource_type = modification.entity.resource_type();
            let applied = self
                .fields
                .find(&resource_type, flag)
                .is_some_and(|field| field.set(&mut *modification.entity, true));

            if applied {
                session.mark_modified(modification);
                rewritten += 1;
                tracing::debug!(
                    "Soft-deleted {}/{}",
                    resource_type,
                    modification.entity.key()
                );
            } else if self.config.missing_flag == MissingFlag::Reject {
                return Err(Error::MissingSoftDeleteField {
                    resource_type,
                    field: flag.to_string(),
                });
            } else {
                tracing::warn!(
                    "{}/{} has no '{}' field, keeping hard delete",
                    resource_type,
                    modification.entity.key(),
                    flag
                );
            }
        }

        Ok(rewritten)
    }
}
