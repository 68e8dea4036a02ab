use spin_sdk::http::Method;

use crate::auth::Requester;
use crate::core::errors::ApiError;
use crate::models::{Post, Profile};

pub fn is_safe_method(method: &Method) -> bool {
    matches!(method, Method::Get | Method::Head | Method::Options)
}

/// Object-level rule: anyone may read, only the owner may write.
pub trait OwnerOrReadOnly {
    fn is_owned_by(&self, requester: &Requester) -> bool;

    fn has_object_permission(&self, method: &Method, requester: Option<&Requester>) -> bool {
        if is_safe_method(method) {
            return true;
        }

        requester.map_or(false, |r| self.is_owned_by(r))
    }
}

/// A profile belongs to its user.
impl OwnerOrReadOnly for Profile {
    fn is_owned_by(&self, requester: &Requester) -> bool {
        self.user_id == requester.user_id
    }
}

/// A post belongs to its author profile.
impl OwnerOrReadOnly for Post {
    fn is_owned_by(&self, requester: &Requester) -> bool {
        requester.profile_id.as_deref() == Some(self.profile_id.as_str())
    }
}

/// 401 for anonymous writers, 403 for authenticated non-owners.
pub fn check_object_permission<T: OwnerOrReadOnly>(
    obj: &T,
    method: &Method,
    requester: Option<&Requester>,
) -> Result<(), ApiError> {
    if obj.has_object_permission(method, requester) {
        return Ok(());
    }

    match requester {
        Some(_) => Err(ApiError::Forbidden),
        None => Err(ApiError::Unauthorized),
    }
}
