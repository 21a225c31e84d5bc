//! Cognito user pool, web client and identity pool.

use std::time::Duration;

use luma_cdk::constructs::cognito::{
    AccountRecovery, AuthFlows, CfnIdentityPool, CognitoIdentityProvider, IdentityPoolProps,
    OAuthFlows, PasswordPolicy, UserPool, UserPoolClientProps, UserPoolProps, provider_name_for,
};
use luma_cdk::{CdkResult, ExportedValue, Expr, RemovalPolicy, Stack, StackProps};
use typed_builder::TypedBuilder;

/// Export name of the user pool ID.
pub const USER_POOL_ID_EXPORT: &str = "LumaUserPoolId";
/// Export name of the user pool ARN.
pub const USER_POOL_ARN_EXPORT: &str = "LumaUserPoolArn";
/// Export name of the web client ID.
pub const USER_POOL_CLIENT_ID_EXPORT: &str = "LumaUserPoolClientId";
/// Export name of the identity pool ID.
pub const IDENTITY_POOL_ID_EXPORT: &str = "LumaIdentityPoolId";

const MINUTE: u64 = 60;
const DAY: u64 = 24 * 60 * MINUTE;

/// Options for [`AuthStack::build`].
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct AuthStackProps {
    /// Stack-level properties.
    #[builder(default)]
    pub stack: StackProps,
}

/// The built auth stack and the values it exports.
#[derive(Debug)]
pub struct AuthStack {
    stack: Stack,
    user_pool_id: ExportedValue,
    user_pool_arn: ExportedValue,
    user_pool_client_id: ExportedValue,
    identity_pool_id: ExportedValue,
}

impl AuthStack {
    /// Declare the auth stack.
    pub fn build(id: &str, props: &AuthStackProps) -> CdkResult<Self> {
        let mut stack = Stack::new(id, &props.stack);

        let pool = UserPool::new(
            &mut stack,
            "LumaUserPool",
            &UserPoolProps::builder()
                .user_pool_name("luma-users")
                .self_sign_up_enabled(true)
                .sign_in_with_email(true)
                .auto_verify_email(true)
                .password_policy(PasswordPolicy {
                    min_length: 8,
                    require_lowercase: true,
                    require_uppercase: true,
                    require_digits: true,
                    require_symbols: false,
                })
                .account_recovery(AccountRecovery::EmailOnly)
                .removal_policy(RemovalPolicy::Retain)
                .build(),
        )?;

        let client = pool.add_client(
            &mut stack,
            "LumaWebClient",
            &UserPoolClientProps::builder()
                .client_name("luma-web-client")
                .auth_flows(AuthFlows {
                    user_password: true,
                    user_srp: true,
                    ..AuthFlows::default()
                })
                .oauth_flows(OAuthFlows {
                    authorization_code_grant: false,
                    implicit_code_grant: false,
                })
                .prevent_user_existence_errors(true)
                .refresh_token_validity(Duration::from_secs(30 * DAY))
                .access_token_validity(Duration::from_secs(60 * MINUTE))
                .id_token_validity(Duration::from_secs(60 * MINUTE))
                .enable_token_revocation(true)
                .build(),
        )?;

        let identity_pool = CfnIdentityPool::new(
            &mut stack,
            "LumaIdentityPool",
            &IdentityPoolProps::builder()
                .identity_pool_name("luma-identity-pool")
                .allow_unauthenticated_identities(false)
                .cognito_identity_providers(vec![CognitoIdentityProvider {
                    client_id: client.user_pool_client_id(),
                    provider_name: pool.user_pool_provider_name(),
                }])
                .build(),
        )?;

        let user_pool_id = stack.export_value(
            "UserPoolId",
            pool.user_pool_id(),
            "Cognito User Pool ID",
            USER_POOL_ID_EXPORT,
        )?;
        let user_pool_arn = stack.export_value(
            "UserPoolArn",
            pool.user_pool_arn(),
            "Cognito User Pool ARN",
            USER_POOL_ARN_EXPORT,
        )?;
        let user_pool_client_id = stack.export_value(
            "UserPoolClientId",
            client.user_pool_client_id(),
            "Cognito User Pool Client ID",
            USER_POOL_CLIENT_ID_EXPORT,
        )?;
        let identity_pool_id = stack.export_value(
            "IdentityPoolId",
            identity_pool.identity_pool_id(),
            "Cognito Identity Pool ID",
            IDENTITY_POOL_ID_EXPORT,
        )?;

        tracing::info!(stack = %id, "declared auth stack");
        Ok(Self {
            stack,
            user_pool_id,
            user_pool_arn,
            user_pool_client_id,
            identity_pool_id,
        })
    }

    /// The declared stack.
    #[must_use]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Hand the stack over to the app.
    #[must_use]
    pub fn into_stack(self) -> Stack {
        self.stack
    }

    /// Exported user pool ID.
    #[must_use]
    pub fn user_pool_id(&self) -> &ExportedValue {
        &self.user_pool_id
    }

    /// Exported user pool ARN.
    #[must_use]
    pub fn user_pool_arn(&self) -> &ExportedValue {
        &self.user_pool_arn
    }

    /// Exported web client ID.
    #[must_use]
    pub fn user_pool_client_id(&self) -> &ExportedValue {
        &self.user_pool_client_id
    }

    /// Exported identity pool ID.
    #[must_use]
    pub fn identity_pool_id(&self) -> &ExportedValue {
        &self.identity_pool_id
    }

    /// The pool's provider name as seen from `consumer`.
    ///
    /// Built from the imported pool ID, so the consumer depends on this stack.
    pub fn user_pool_provider_name(&self, consumer: &mut Stack) -> Expr {
        provider_name_for(consumer.import(&self.user_pool_id))
    }
}
