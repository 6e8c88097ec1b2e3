use crate::domain::order::ActorId;
use crate::domain::ports::Authorizer;
use std::collections::HashSet;

/// Grants admin rights to a fixed set of actor ids.
#[derive(Debug, Default, Clone)]
pub struct StaticAuthorizer {
    admins: HashSet<String>,
}

impl StaticAuthorizer {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }
}

impl Authorizer for StaticAuthorizer {
    fn is_admin(&self, actor: &ActorId) -> bool {
        self.admins.contains(actor.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_authorizer() {
        let auth = StaticAuthorizer::new(["admin", "ops"]);
        assert!(auth.is_admin(&ActorId::new("ops")));
        assert!(!auth.is_admin(&ActorId::new("alice")));
        assert!(!StaticAuthorizer::default().is_admin(&ActorId::new("admin")));
    }
}
