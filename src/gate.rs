use crate::{AuthStrategy, ExemptPaths, RequestContext, User};

/// What to do with an inbound request.
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// No authentication is configured, or the path is exempt.
    Open,
    /// The request authenticated the given user.
    Authenticated(User),
    /// The request carries neither an `Authorization` header nor a session cookie.
    Unauthorized,
    /// The request carries credentials, but they do not resolve to a user.
    Forbidden,
}

impl GateDecision {
    /// Returns true if the request may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Open | Self::Authenticated(_))
    }

    /// The HTTP status code a rejected request should be answered with.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Open | Self::Authenticated(_) => None,
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
        }
    }
}

/// Decides for each inbound request whether it may proceed, using the strategy selected at process start.
#[derive(Debug)]
pub struct RequestGate {
    strategy: Option<Box<dyn AuthStrategy>>,
    exempt_paths: ExemptPaths,
}

impl RequestGate {
    /// Create a gate. Without a strategy, every request is let through.
    pub fn new(strategy: Option<Box<dyn AuthStrategy>>, exempt_paths: ExemptPaths) -> Self {
        Self {
            strategy,
            exempt_paths,
        }
    }

    /// The active strategy, for the login and logout collaborators.
    pub fn strategy(&self) -> Option<&dyn AuthStrategy> {
        self.strategy.as_deref()
    }

    /// Decide about `request`.
    pub async fn check(&self, request: &RequestContext) -> GateDecision {
        let Some(strategy) = self.strategy.as_deref() else {
            return GateDecision::Open;
        };
        if !strategy.requires_auth(request.path(), &self.exempt_paths) {
            return GateDecision::Open;
        }
        if strategy.authorization_header(request).is_none()
            && strategy.session_cookie(request).is_none()
        {
            return GateDecision::Unauthorized;
        }
        match strategy.current_user(request).await {
            Some(user) => GateDecision::Authenticated(user),
            None => GateDecision::Forbidden,
        }
    }
}
