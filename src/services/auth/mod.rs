pub mod external;
pub mod factory;
pub mod firebase;
pub mod self_issued;
pub mod verifier;

pub use external::{DecodedIdToken, ExternalIdentityVerifier, IdTokenError, IdTokenVerifier};
pub use factory::build_verifier;
pub use firebase::FirebaseTokenVerifier;
pub use self_issued::{SelfIssuedVerifier, TokenIssuer, issue_token};
pub use verifier::{CredentialVerifier, VerifiedIdentity, VerifyError};
