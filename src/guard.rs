use crate::models::UserRole;
use crate::session::SessionState;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session is still being restored; show nothing yet.
    Pending,
    Allow,
    Redirect(&'static str),
}

#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    allowed_roles: Option<Vec<UserRole>>,
}

impl RouteGuard {
    pub fn authenticated() -> Self {
        RouteGuard { allowed_roles: None }
    }

    pub fn for_roles(roles: &[UserRole]) -> Self {
        RouteGuard {
            allowed_roles: Some(roles.to_vec()),
        }
    }

    pub fn patient_only() -> Self {
        Self::for_roles(&[UserRole::Patient])
    }

    pub fn doctor_only() -> Self {
        Self::for_roles(&[UserRole::Doctor])
    }

    pub fn admin_only() -> Self {
        Self::for_roles(&[UserRole::Admin])
    }

    pub fn check(&self, session: &SessionState) -> RouteDecision {
        if session.loading {
            return RouteDecision::Pending;
        }
        let user = match &session.user {
            Some(user) => user,
            None => return RouteDecision::Redirect(LOGIN_PATH),
        };
        match &self.allowed_roles {
            Some(roles) if !roles.contains(&user.role) => RouteDecision::Redirect(HOME_PATH),
            _ => RouteDecision::Allow,
        }
    }
}
