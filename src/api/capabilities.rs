//! Capabilities service
//!
//! Get the capabilities of the caller from the request based on the Authorization header

use std::marker::PhantomData;

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use serde::Serialize;

use crate::api::Error;

/// The keys used for encoding/decoding JWT tokens
#[derive(Clone)]
pub struct JwtKeys {
    /// The encoding key
    encoding: EncodingKey,

    /// The decoding key
    decoding: DecodingKey,
}

impl JwtKeys {
    /// Create new encoding/decoding keys, derived from a secret
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Mutations on url aliases that need to be granted explicitly
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Create url aliases
    Create,

    /// Update url aliases
    Update,

    /// Delete url aliases
    Delete,
}

impl Capability {
    /// All known capabilities
    pub const ALL: [Capability; 3] = [Capability::Create, Capability::Update, Capability::Delete];

    /// The opaque token granting the capability
    pub fn token(self) -> &'static str {
        match self {
            Capability::Create => "create_url-alias",
            Capability::Update => "update_url-alias",
            Capability::Delete => "delete_url-alias",
        }
    }
}

/// A capability known up front, used to pick what [`Granted`] requires
pub trait Grant: Send + Sync {
    /// The required capability
    const CAPABILITY: Capability;
}

/// Requires [`Capability::Create`]
pub struct CreateGrant;

impl Grant for CreateGrant {
    const CAPABILITY: Capability = Capability::Create;
}

/// Requires [`Capability::Update`]
pub struct UpdateGrant;

impl Grant for UpdateGrant {
    const CAPABILITY: Capability = Capability::Update;
}

/// Requires [`Capability::Delete`]
pub struct DeleteGrant;

impl Grant for DeleteGrant {
    const CAPABILITY: Capability = Capability::Delete;
}

/// Something that can be asked whether a capability is granted
pub trait Authorize {
    /// Is the capability granted?
    fn can(&self, capability: Capability) -> bool;

    /// Require a capability
    ///
    /// # Errors
    ///
    /// Will return `Err` with a forbidden response when the capability is not granted
    fn require(&self, capability: Capability) -> Result<(), Error> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(Error::forbidden("Forbidden").with_description(format!(
                "Missing capability `{}`",
                capability.token()
            )))
        }
    }
}

/// The JWT claims to identify a caller and its capabilities
#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    /// The caller
    sub: String,

    /// When does the token expire, as UNIX timestamp
    exp: i64,

    /// Granted capability tokens
    #[serde(default)]
    caps: Vec<String>,
}

/// Generate an access token granting capabilities to a subject
///
/// # Errors
///
/// Will return `Err` when the token can not be encoded
pub fn generate_token(
    jwt_keys: &JwtKeys,
    subject: &str,
    capabilities: &[Capability],
    expires_in: i64,
) -> Result<String, Error> {
    use jsonwebtoken::Header;
    use jsonwebtoken::encode;

    let claims = Claims {
        sub: subject.to_string(),
        exp: chrono::Utc::now().timestamp() + expires_in,
        caps: capabilities
            .iter()
            .map(|capability| capability.token().to_string())
            .collect(),
    };

    encode(&Header::default(), &claims, &jwt_keys.encoding).map_err(Error::internal_server_error)
}

/// The caller of a management endpoint
#[derive(Clone, Debug)]
pub struct Principal {
    /// Who is calling
    pub subject: String,

    /// Granted capability tokens
    capabilities: Vec<String>,
}

impl Authorize for Principal {
    fn can(&self, capability: Capability) -> bool {
        self.capabilities
            .iter()
            .any(|token| token == capability.token())
    }
}

impl<B> FromRequestParts<B> for Principal
where
    B: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &B) -> Result<Self, Self::Rejection> {
        use jsonwebtoken::Validation;
        use jsonwebtoken::decode;

        // Extract the token from the authorization header
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| Error::forbidden("Missing API token"))?;

        let Extension(jwt_keys) = parts
            .extract::<Extension<JwtKeys>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get JWT keys"))?;

        let validation = Validation::default();

        let token_data = decode::<Claims>(bearer.token(), &jwt_keys.decoding, &validation)
            .map_err(|err| Error::forbidden(format!("Invalid token: {err}")))?;

        let claims = token_data.claims;

        Ok(Principal {
            subject: claims.sub,
            capabilities: claims.caps,
        })
    }
}

/// A caller holding the capability of `G`
///
/// Extracted from the request parts, so the check is done before the body is read
pub struct Granted<G: Grant> {
    /// The caller
    pub principal: Principal,

    grant: PhantomData<G>,
}

impl<B, G> FromRequestParts<B> for Granted<G>
where
    B: Send + Sync,
    G: Grant,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &B) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;

        principal.require(G::CAPABILITY)?;

        Ok(Self {
            principal,
            grant: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(capabilities: &[Capability]) -> Principal {
        Principal {
            subject: "tester".to_string(),
            capabilities: capabilities
                .iter()
                .map(|capability| capability.token().to_string())
                .collect(),
        }
    }

    #[test]
    fn test_capability_tokens() {
        assert_eq!("create_url-alias", Capability::Create.token());
        assert_eq!("update_url-alias", Capability::Update.token());
        assert_eq!("delete_url-alias", Capability::Delete.token());
    }

    #[test]
    fn test_require() {
        let principal = principal(&[Capability::Create]);

        assert!(principal.can(Capability::Create));
        assert!(principal.require(Capability::Create).is_ok());

        assert!(!principal.can(Capability::Delete));
        assert!(principal.require(Capability::Delete).is_err());
    }

    #[tokio::test]
    async fn test_generated_token_is_accepted() {
        let jwt_keys = JwtKeys::new(b"verysecret");

        let access_token = generate_token(&jwt_keys, "tester", &[Capability::Update], 60).unwrap();

        let (mut parts, ()) = axum::http::Request::builder()
            .header(
                axum::http::header::AUTHORIZATION,
                format!("Bearer {access_token}"),
            )
            .extension(jwt_keys)
            .body(())
            .unwrap()
            .into_parts();

        let principal = Principal::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!("tester", principal.subject);
        assert!(principal.can(Capability::Update));
        assert!(!principal.can(Capability::Create));
    }
}
