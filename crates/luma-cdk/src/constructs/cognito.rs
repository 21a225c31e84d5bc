//! Cognito user pools, app clients and identity pools.

use std::time::Duration;

use serde_json::{Value, json};
use typed_builder::TypedBuilder;

use crate::error::CdkResult;
use crate::intrinsic::{Expr, Pseudo};
use crate::stack::{CfnResource, RemovalPolicy, Stack};

const VERIFICATION_MESSAGE: &str = "The verification code to your new account is {####}";
const VERIFICATION_SUBJECT: &str = "Verify your new account";

/// Password requirements for users of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum length.
    pub min_length: u8,
    /// Require a lowercase letter.
    pub require_lowercase: bool,
    /// Require an uppercase letter.
    pub require_uppercase: bool,
    /// Require a digit.
    pub require_digits: bool,
    /// Require a symbol.
    pub require_symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_lowercase: true,
            require_uppercase: true,
            require_digits: true,
            require_symbols: true,
        }
    }
}

/// How users recover a forgotten password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountRecovery {
    /// Verified email only.
    EmailOnly,
    /// Verified phone without MFA, then email.
    #[default]
    PhoneWithoutMfaAndEmail,
    /// Verified phone without MFA only.
    PhoneOnlyWithoutMfa,
}

impl AccountRecovery {
    fn mechanisms(self) -> Value {
        match self {
            Self::EmailOnly => json!([{ "Name": "verified_email", "Priority": 1 }]),
            Self::PhoneWithoutMfaAndEmail => json!([
                { "Name": "verified_phone_number", "Priority": 1 },
                { "Name": "verified_email", "Priority": 2 },
            ]),
            Self::PhoneOnlyWithoutMfa => {
                json!([{ "Name": "verified_phone_number", "Priority": 1 }])
            }
        }
    }
}

/// Options for [`UserPool`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct UserPoolProps {
    /// Physical pool name.
    #[builder(setter(into))]
    pub user_pool_name: String,
    /// Allow users to sign themselves up.
    #[builder(default)]
    pub self_sign_up_enabled: bool,
    /// Users sign in with their email address.
    #[builder(default)]
    pub sign_in_with_email: bool,
    /// Verify email addresses automatically by sending a code.
    #[builder(default)]
    pub auto_verify_email: bool,
    /// Password requirements.
    #[builder(default)]
    pub password_policy: PasswordPolicy,
    /// Account recovery mechanism.
    #[builder(default)]
    pub account_recovery: AccountRecovery,
    /// Removal policy; pools are kept by default.
    #[builder(default = RemovalPolicy::Retain)]
    pub removal_policy: RemovalPolicy,
}

/// A declared `AWS::Cognito::UserPool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPool {
    id: String,
    logical_id: String,
}

impl UserPool {
    /// Declare the pool at construct `id`.
    pub fn new(stack: &mut Stack, id: &str, props: &UserPoolProps) -> CdkResult<Self> {
        let policy = props.password_policy;
        let mut properties = json!({
            "AccountRecoverySetting": { "RecoveryMechanisms": props.account_recovery.mechanisms() },
            "AdminCreateUserConfig": { "AllowAdminCreateUserOnly": !props.self_sign_up_enabled },
            "EmailVerificationMessage": VERIFICATION_MESSAGE,
            "EmailVerificationSubject": VERIFICATION_SUBJECT,
            "Policies": {
                "PasswordPolicy": {
                    "MinimumLength": policy.min_length,
                    "RequireLowercase": policy.require_lowercase,
                    "RequireNumbers": policy.require_digits,
                    "RequireSymbols": policy.require_symbols,
                    "RequireUppercase": policy.require_uppercase,
                }
            },
            "SmsVerificationMessage": VERIFICATION_MESSAGE,
            "UserPoolName": props.user_pool_name,
            "VerificationMessageTemplate": {
                "DefaultEmailOption": "CONFIRM_WITH_CODE",
                "EmailMessage": VERIFICATION_MESSAGE,
                "EmailSubject": VERIFICATION_SUBJECT,
                "SmsMessage": VERIFICATION_MESSAGE,
            },
        });
        if props.sign_in_with_email {
            properties["UsernameAttributes"] = json!(["email"]);
            properties["UsernameConfiguration"] = json!({ "CaseSensitive": false });
        }
        if props.auto_verify_email {
            properties["AutoVerifiedAttributes"] = json!(["email"]);
        }

        let logical_id = stack.add_resource(
            &[id, "Resource"],
            CfnResource::new("AWS::Cognito::UserPool", properties)
                .removal_policy(props.removal_policy),
        )?;

        Ok(Self {
            id: id.to_owned(),
            logical_id,
        })
    }

    /// Logical ID of the pool.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Pool ID (`Ref`).
    #[must_use]
    pub fn user_pool_id(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// Pool ARN.
    #[must_use]
    pub fn user_pool_arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }

    /// Provider name, `cognito-idp.<region>.amazonaws.com/<pool id>`.
    #[must_use]
    pub fn user_pool_provider_name(&self) -> Expr {
        Expr::get_att(&self.logical_id, "ProviderName")
    }

    /// Declare an app client of this pool at construct `<pool>/<id>`.
    pub fn add_client(
        &self,
        stack: &mut Stack,
        id: &str,
        props: &UserPoolClientProps,
    ) -> CdkResult<UserPoolClient> {
        UserPoolClient::new(stack, &[self.id.as_str(), id], self, props)
    }
}

/// Build a pool's provider name from its ID in the current region.
///
/// Used where `Fn::GetAtt ProviderName` is unavailable, i.e. in a stack that
/// only sees the pool ID through an import.
#[must_use]
pub fn provider_name_for(user_pool_id: Expr) -> Expr {
    Expr::concat([
        Expr::literal("cognito-idp."),
        Pseudo::Region.into(),
        Expr::literal("."),
        Pseudo::UrlSuffix.into(),
        Expr::literal("/"),
        user_pool_id,
    ])
}

/// Authentication flows an app client accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthFlows {
    /// `ALLOW_USER_PASSWORD_AUTH`
    pub user_password: bool,
    /// `ALLOW_USER_SRP_AUTH`
    pub user_srp: bool,
    /// `ALLOW_ADMIN_USER_PASSWORD_AUTH`
    pub admin_user_password: bool,
    /// `ALLOW_CUSTOM_AUTH`
    pub custom: bool,
}

impl AuthFlows {
    fn explicit_flows(self) -> Vec<&'static str> {
        let mut flows = Vec::new();
        if self.user_password {
            flows.push("ALLOW_USER_PASSWORD_AUTH");
        }
        if self.admin_user_password {
            flows.push("ALLOW_ADMIN_USER_PASSWORD_AUTH");
        }
        if self.custom {
            flows.push("ALLOW_CUSTOM_AUTH");
        }
        if self.user_srp {
            flows.push("ALLOW_USER_SRP_AUTH");
        }
        if !flows.is_empty() {
            flows.push("ALLOW_REFRESH_TOKEN_AUTH");
        }
        flows
    }
}

/// OAuth grant types enabled on an app client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OAuthFlows {
    /// Authorization code grant.
    pub authorization_code_grant: bool,
    /// Implicit grant.
    pub implicit_code_grant: bool,
}

/// Options for [`UserPoolClient`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct UserPoolClientProps {
    /// Client name.
    #[builder(setter(into))]
    pub client_name: String,
    /// Accepted authentication flows.
    #[builder(default)]
    pub auth_flows: AuthFlows,
    /// OAuth grants; all disabled by default.
    #[builder(default)]
    pub oauth_flows: OAuthFlows,
    /// Hide whether a user exists in sign-in errors.
    #[builder(default)]
    pub prevent_user_existence_errors: bool,
    /// Refresh token lifetime.
    #[builder(default = Duration::from_secs(30 * 24 * 60 * 60))]
    pub refresh_token_validity: Duration,
    /// Access token lifetime.
    #[builder(default = Duration::from_secs(60 * 60))]
    pub access_token_validity: Duration,
    /// ID token lifetime.
    #[builder(default = Duration::from_secs(60 * 60))]
    pub id_token_validity: Duration,
    /// Allow refresh tokens to be revoked.
    #[builder(default = true)]
    pub enable_token_revocation: bool,
}

/// A declared `AWS::Cognito::UserPoolClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPoolClient {
    logical_id: String,
}

impl UserPoolClient {
    fn new(
        stack: &mut Stack,
        scope: &[&str],
        pool: &UserPool,
        props: &UserPoolClientProps,
    ) -> CdkResult<Self> {
        let mut properties = json!({
            "AccessTokenValidity": whole_minutes(props.access_token_validity),
            "ClientName": props.client_name,
            "EnableTokenRevocation": props.enable_token_revocation,
            "IdTokenValidity": whole_minutes(props.id_token_validity),
            "RefreshTokenValidity": whole_minutes(props.refresh_token_validity),
            "SupportedIdentityProviders": ["COGNITO"],
            "TokenValidityUnits": {
                "AccessToken": "minutes",
                "IdToken": "minutes",
                "RefreshToken": "minutes",
            },
            "UserPoolId": pool.user_pool_id(),
        });

        let explicit = props.auth_flows.explicit_flows();
        if !explicit.is_empty() {
            properties["ExplicitAuthFlows"] = json!(explicit);
        }

        let mut oauth = Vec::new();
        if props.oauth_flows.authorization_code_grant {
            oauth.push("code");
        }
        if props.oauth_flows.implicit_code_grant {
            oauth.push("implicit");
        }
        if oauth.is_empty() {
            properties["AllowedOAuthFlowsUserPoolClient"] = json!(false);
        } else {
            properties["AllowedOAuthFlows"] = json!(oauth);
            properties["AllowedOAuthFlowsUserPoolClient"] = json!(true);
            properties["AllowedOAuthScopes"] =
                json!(["profile", "phone", "email", "openid", "aws.cognito.signin.user.admin"]);
            properties["CallbackURLs"] = json!(["https://example.com"]);
        }

        if props.prevent_user_existence_errors {
            properties["PreventUserExistenceErrors"] = json!("ENABLED");
        }

        let mut path = scope.to_vec();
        path.push("Resource");
        let logical_id = stack.add_resource(
            &path,
            CfnResource::new("AWS::Cognito::UserPoolClient", properties),
        )?;
        Ok(Self { logical_id })
    }

    /// Logical ID of the client.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Client ID (`Ref`).
    #[must_use]
    pub fn user_pool_client_id(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }
}

fn whole_minutes(d: Duration) -> u64 {
    d.as_secs() / 60
}

/// A Cognito user pool acting as identity provider for an identity pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CognitoIdentityProvider {
    /// App client ID.
    pub client_id: Expr,
    /// Provider name of the pool.
    pub provider_name: Expr,
}

/// Options for [`CfnIdentityPool`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct IdentityPoolProps {
    /// Physical pool name.
    #[builder(setter(into))]
    pub identity_pool_name: String,
    /// Issue credentials to unauthenticated identities.
    #[builder(default)]
    pub allow_unauthenticated_identities: bool,
    /// User pools that can authenticate identities.
    #[builder(default)]
    pub cognito_identity_providers: Vec<CognitoIdentityProvider>,
}

/// A declared `AWS::Cognito::IdentityPool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfnIdentityPool {
    logical_id: String,
}

impl CfnIdentityPool {
    /// Declare the identity pool at construct `id`.
    pub fn new(stack: &mut Stack, id: &str, props: &IdentityPoolProps) -> CdkResult<Self> {
        let providers: Vec<Value> = props
            .cognito_identity_providers
            .iter()
            .map(|p| json!({ "ClientId": p.client_id, "ProviderName": p.provider_name }))
            .collect();

        let logical_id = stack.add_resource(
            &[id],
            CfnResource::new(
                "AWS::Cognito::IdentityPool",
                json!({
                    "AllowUnauthenticatedIdentities": props.allow_unauthenticated_identities,
                    "CognitoIdentityProviders": providers,
                    "IdentityPoolName": props.identity_pool_name,
                }),
            ),
        )?;
        Ok(Self { logical_id })
    }

    /// Logical ID of the identity pool.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Identity pool ID (`Ref`).
    #[must_use]
    pub fn identity_pool_id(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }
}
