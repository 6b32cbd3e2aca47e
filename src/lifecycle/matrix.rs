use crate::error::{DispatchError, Result};
use crate::types::{Job, ProjectStatus, Requester, Role};
use std::collections::HashMap;

/// Who, beyond holding the role, must the requester be?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentRequirement {
    None,
    AssignedTechnician,
    AssignedEditor,
}

/// Rows granted to field roles; managers get every pair.
const FIELD_RULES: &[(Role, ProjectStatus, ProjectStatus, AssignmentRequirement)] = &[
    (
        Role::Technician,
        ProjectStatus::Booked,
        ProjectStatus::Shooting,
        AssignmentRequirement::AssignedTechnician,
    ),
    (
        Role::Technician,
        ProjectStatus::Shooting,
        ProjectStatus::Editing,
        AssignmentRequirement::AssignedTechnician,
    ),
    (
        Role::Editor,
        ProjectStatus::Editing,
        ProjectStatus::Delivered,
        AssignmentRequirement::AssignedEditor,
    ),
];

/// Lookup table `(role, current, target) -> requirement`; absent means forbidden.
#[derive(Debug, Clone)]
pub struct TransitionMatrix {
    rules: HashMap<(Role, ProjectStatus, ProjectStatus), AssignmentRequirement>,
}

impl TransitionMatrix {
    #[must_use]
    pub fn standard() -> Self {
        let mut rules = HashMap::new();
        for role in Role::ALL.into_iter().filter(Role::is_manager) {
            for from in ProjectStatus::ALL {
                for to in ProjectStatus::ALL {
                    rules.insert((role, from, to), AssignmentRequirement::None);
                }
            }
        }
        for (role, from, to, requirement) in FIELD_RULES {
            rules.insert((*role, *from, *to), *requirement);
        }
        Self { rules }
    }

    #[must_use]
    pub fn rule(
        &self,
        role: Role,
        from: ProjectStatus,
        to: ProjectStatus,
    ) -> Option<AssignmentRequirement> {
        self.rules.get(&(role, from, to)).copied()
    }

    #[must_use]
    pub fn is_allowed(&self, role: Role, from: ProjectStatus, to: ProjectStatus) -> bool {
        self.rule(role, from, to).is_some()
    }

    /// # Errors
    /// `Forbidden` when the role has no row for `(job.status, target)` or the
    /// requester is not the technician/editor the row requires.
    pub fn authorize(&self, requester: &Requester, job: &Job, target: ProjectStatus) -> Result<()> {
        let requirement = self.rule(requester.role, job.status, target).ok_or_else(|| {
            DispatchError::Forbidden(format!(
                "{} may not move job {} from {} to {target}",
                requester.role, job.id, job.status
            ))
        })?;

        let satisfied = match requirement {
            AssignmentRequirement::None => true,
            AssignmentRequirement::AssignedTechnician => {
                requester.technician_id.is_some()
                    && requester.technician_id == job.assigned_technician
            }
            AssignmentRequirement::AssignedEditor => {
                job.assigned_editor == Some(requester.user_id)
            }
        };

        if satisfied {
            Ok(())
        } else {
            Err(DispatchError::Forbidden(format!(
                "user {} is not the {} assigned to job {}",
                requester.user_id,
                requester.role.as_str().to_ascii_lowercase(),
                job.id
            )))
        }
    }
}

impl Default for TransitionMatrix {
    fn default() -> Self {
        Self::standard()
    }
}
