//! SignupHandler - creates a member account in tier selection.

use std::sync::Arc;

use crate::domain::member::{Member, MemberError};
use crate::ports::MemberRepository;

/// Command to create an account.
///
/// Credential storage lives with the identity collaborator; the password is
/// validated here so a bad one fails before the account row exists.
#[derive(Debug, Clone)]
pub struct SignupCommand {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// Handler for account creation.
///
/// New accounts land directly in `PendingTierSelection`; there is no
/// persisted pre-account state.
pub struct SignupHandler {
    members: Arc<dyn MemberRepository>,
}

impl SignupHandler {
    pub fn new(members: Arc<dyn MemberRepository>) -> Self {
        Self { members }
    }

    pub async fn handle(&self, cmd: SignupCommand) -> Result<Member, MemberError> {
        if cmd.password.len() < 8 {
            return Err(MemberError::validation(
                "password",
                "must be at least 8 characters",
            ));
        }

        if let Some(existing) = self.members.find_by_email(&cmd.email).await? {
            return Err(MemberError::email_taken(existing.email));
        }

        let id = self.members.allocate_id().await?;
        let member = Member::signup(id, cmd.email, cmd.name).map_err(|e| {
            MemberError::validation("email", e.to_string())
        })?;
        self.members.save(&member).await?;

        tracing::info!(
            member_id = %member.id,
            member_number = %member.member_number,
            "member account created"
        );
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryMemberRepository;
    use crate::domain::member::MemberStatus;

    fn command(email: &str) -> SignupCommand {
        SignupCommand {
            email: email.to_string(),
            password: "correct-horse".to_string(),
            name: Some("Pat".to_string()),
        }
    }

    #[tokio::test]
    async fn creates_member_in_tier_selection() {
        let handler = SignupHandler::new(Arc::new(InMemoryMemberRepository::new()));

        let member = handler.handle(command("pat@example.com")).await.unwrap();

        assert_eq!(member.status, MemberStatus::PendingTierSelection);
        assert!(member.member_number.as_str().starts_with("QF"));
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let handler = SignupHandler::new(Arc::new(InMemoryMemberRepository::new()));
        handler.handle(command("pat@example.com")).await.unwrap();

        let result = handler.handle(command("pat@example.com")).await;
        assert!(matches!(result, Err(MemberError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn rejects_short_password() {
        let handler = SignupHandler::new(Arc::new(InMemoryMemberRepository::new()));

        let mut cmd = command("pat@example.com");
        cmd.password = "short".to_string();

        let result = handler.handle(cmd).await;
        assert!(matches!(result, Err(MemberError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn rejects_malformed_email() {
        let handler = SignupHandler::new(Arc::new(InMemoryMemberRepository::new()));
        let result = handler.handle(command("not-an-email")).await;
        assert!(matches!(result, Err(MemberError::ValidationFailed { .. })));
    }
}
