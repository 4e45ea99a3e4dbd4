mod common;

use anyhow::{ensure, Result};
use chrono::{Duration, Utc};
use common::{harness, harness_with, racing_harness, PASSWORD};
use edu_auth::{
    auth::{AuthError, LoginOutcome, Role, VerificationKind},
    store::{RefreshSessionStore, UserStore},
};
use uuid::Uuid;

#[tokio::test]
async fn registration_creates_unconfirmed_user_with_five_minute_code() -> Result<()> {
    let h = harness()?;
    let user = h.auth.register("a@x.com", PASSWORD).await?;
    ensure!(!user.confirmed);
    ensure!(user.role == Role::Student);

    let codes = h.store.codes_for("a@x.com", VerificationKind::Registration).await;
    ensure!(codes.len() == 1, "expected one code, got {}", codes.len());
    let code = &codes[0];
    ensure!(code.user_id == user.id);
    ensure!(!code.used);
    ensure!(code.code.len() == 6 && code.code.chars().all(|c| c.is_ascii_digit()));
    ensure!(code.expires_at - code.created_at == Duration::minutes(5));

    let sent = h.mail.sent();
    ensure!(sent.len() == 1);
    ensure!(sent[0].code == code.code && sent[0].kind == VerificationKind::Registration);
    Ok(())
}

#[tokio::test]
async fn login_unconfirmed_checks_password_first() -> Result<()> {
    let h = harness()?;
    h.auth.register("a@x.com", PASSWORD).await?;

    let correct = h.auth.login("a@x.com", PASSWORD).await;
    ensure!(matches!(correct, Err(AuthError::EmailNotConfirmed)));

    // A wrong password is reported as such before confirmation is looked at.
    let wrong = h.auth.login("a@x.com", "Wrong1234").await;
    ensure!(matches!(wrong, Err(AuthError::InvalidPassword)));
    Ok(())
}

#[tokio::test]
async fn consumed_code_cannot_be_reused() -> Result<()> {
    let h = harness()?;
    h.auth.register("a@x.com", PASSWORD).await?;
    let code = h.mail.last("a@x.com", VerificationKind::Registration)?;

    h.auth.verify_email("a@x.com", &code).await?;
    let again = h.auth.verify_email("a@x.com", &code).await;
    ensure!(matches!(again, Err(AuthError::CodeExpired)));
    Ok(())
}

#[tokio::test]
async fn wrong_code_does_not_burn_the_active_one() -> Result<()> {
    let h = harness()?;
    h.auth.register("a@x.com", PASSWORD).await?;
    let code = h.mail.last("a@x.com", VerificationKind::Registration)?;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let result = h.auth.verify_email("a@x.com", wrong).await;
    ensure!(matches!(result, Err(AuthError::InvalidCode)));
    h.auth.verify_email("a@x.com", &code).await?;
    Ok(())
}

#[tokio::test]
async fn codes_are_scoped_to_their_purpose() -> Result<()> {
    let h = harness()?;
    h.confirmed_user("a@x.com").await?;
    h.auth.initiate_password_reset("a@x.com").await?;
    let reset_code = h.mail.last("a@x.com", VerificationKind::Password)?;

    let result = h.auth.verify_login("a@x.com", &reset_code).await;
    ensure!(matches!(result, Err(AuthError::CodeExpired)));
    Ok(())
}

#[tokio::test]
async fn access_token_is_revoked_by_password_reset() -> Result<()> {
    let h = harness()?;
    let (user_id, pair) = h.confirmed_user("a@x.com").await?;

    let claims = h.auth.validate_token(&pair.access_token).await?;
    ensure!(claims.user_id == user_id);
    ensure!(claims.role == Role::Student);

    h.auth.initiate_password_reset("a@x.com").await?;
    let code = h.mail.last("a@x.com", VerificationKind::Password)?;
    h.auth.reset_password("a@x.com", &code, "NewPass1").await?;

    let result = h.auth.validate_token(&pair.access_token).await;
    ensure!(matches!(
        result,
        Err(AuthError::TokenInvalidatedByPasswordChange)
    ));

    // Fresh credentials work and the old password does not.
    ensure!(matches!(
        h.auth.login("a@x.com", PASSWORD).await,
        Err(AuthError::InvalidPassword)
    ));
    let fresh = h.login("a@x.com", "NewPass1").await?;
    h.auth.validate_token(&fresh.access_token).await?;
    Ok(())
}

#[tokio::test]
async fn expired_refresh_session_is_deleted_then_unknown() -> Result<()> {
    let h = harness_with(&common::config().with_refresh_ttl_seconds(1))?;
    let (user_id, pair) = h.confirmed_user("a@x.com").await?;

    // Push the stored expiry into the past.
    let sessions = h.store.sessions_for_user(user_id).await;
    ensure!(sessions.len() == 1);
    let current = &sessions[0].token_hash;
    h.store
        .rotate(current, current, Utc::now() - Duration::seconds(1))
        .await?;

    let first = h.auth.refresh_tokens(&pair.refresh_token).await;
    ensure!(matches!(first, Err(AuthError::RefreshTokenExpired)));
    ensure!(h.store.sessions_for_user(user_id).await.is_empty());

    let second = h.auth.refresh_tokens(&pair.refresh_token).await;
    ensure!(matches!(second, Err(AuthError::InvalidRefreshToken)));
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_in_place() -> Result<()> {
    let h = harness()?;
    let (user_id, pair) = h.confirmed_user("a@x.com").await?;

    let rotated = h.auth.refresh_tokens(&pair.refresh_token).await?;
    ensure!(rotated.refresh_token != pair.refresh_token);
    ensure!(h.store.sessions_for_user(user_id).await.len() == 1);
    h.auth.validate_token(&rotated.access_token).await?;

    let replay = h.auth.refresh_tokens(&pair.refresh_token).await;
    ensure!(matches!(replay, Err(AuthError::InvalidRefreshToken)));
    h.auth.refresh_tokens(&rotated.refresh_token).await?;
    Ok(())
}

#[tokio::test]
async fn unknown_refresh_token_is_invalid() -> Result<()> {
    let h = harness()?;
    let result = h.auth.refresh_tokens("never-issued").await;
    ensure!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    Ok(())
}

#[tokio::test]
async fn reset_request_for_unknown_email_reports_not_found() -> Result<()> {
    let h = harness()?;
    let result = h.auth.initiate_password_reset("nobody@x.com").await;
    ensure!(matches!(result, Err(AuthError::UserNotFound)));
    ensure!(h.mail.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn external_id_is_linked() -> Result<()> {
    let h = harness()?;
    let (user_id, _) = h.confirmed_user("a@x.com").await?;
    h.auth.update_external_id(user_id, "google-oauth2|42").await?;

    let user = h.store.get_by_id(user_id).await?;
    ensure!(user.and_then(|user| user.external_id).as_deref() == Some("google-oauth2|42"));

    let missing = h.auth.update_external_id(Uuid::new_v4(), "x").await;
    ensure!(matches!(missing, Err(AuthError::UserNotFound)));
    Ok(())
}

#[tokio::test]
async fn scenario_a_register_then_verify_email() -> Result<()> {
    let h = harness()?;
    let user = h.auth.register("a@x.com", PASSWORD).await?;
    let code = h
        .active_code("a@x.com", VerificationKind::Registration)
        .await?
        .ok_or_else(|| anyhow::anyhow!("registration code missing"))?;

    let pair = h.auth.verify_email("a@x.com", &code).await?;
    ensure!(!pair.access_token.is_empty() && !pair.refresh_token.is_empty());

    let stored = h.store.get_by_id(user.id).await?;
    ensure!(stored.map(|user| user.confirmed) == Some(true));
    ensure!(h.store.sessions_for_user(user.id).await.len() == 1);
    Ok(())
}

#[tokio::test]
async fn scenario_b_login_sends_code_before_tokens() -> Result<()> {
    let h = harness()?;
    let (user_id, _) = h.confirmed_user("a@x.com").await?;

    let outcome = h.auth.login("a@x.com", PASSWORD).await?;
    ensure!(outcome == LoginOutcome::VerificationSent);
    let code = h
        .active_code("a@x.com", VerificationKind::Login)
        .await?
        .ok_or_else(|| anyhow::anyhow!("login code missing"))?;

    let pair = h.auth.verify_login("a@x.com", &code).await?;
    let claims = h.auth.validate_token(&pair.access_token).await?;
    ensure!(claims.user_id == user_id);
    ensure!(h.store.sessions_for_user(user_id).await.len() == 2);
    Ok(())
}

#[tokio::test]
async fn scenario_c_reset_revokes_every_session() -> Result<()> {
    let h = harness()?;
    let (user_id, first) = h.confirmed_user("a@x.com").await?;
    let second = h.login("a@x.com", PASSWORD).await?;
    ensure!(h.store.sessions_for_user(user_id).await.len() == 2);

    h.auth.initiate_password_reset("a@x.com").await?;
    let code = h.mail.last("a@x.com", VerificationKind::Password)?;
    h.auth.reset_password("a@x.com", &code, "NewPass1").await?;

    ensure!(h.store.sessions_for_user(user_id).await.is_empty());
    for old in [&first.refresh_token, &second.refresh_token] {
        let result = h.auth.refresh_tokens(old).await;
        ensure!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }
    Ok(())
}

#[tokio::test]
async fn scenario_d_concurrent_refresh_leaves_one_usable_token() -> Result<()> {
    let h = racing_harness(2)?;
    let (_, pair) = h.confirmed_user("a@x.com").await?;

    // Both lookups complete before either rotation runs.
    let (a, b) = tokio::join!(
        h.auth.refresh_tokens(&pair.refresh_token),
        h.auth.refresh_tokens(&pair.refresh_token)
    );

    let (winner, loser) = match (a, b) {
        (Ok(winner), loser) | (loser, Ok(winner)) => (winner, loser),
        (Err(a), Err(b)) => anyhow::bail!("both refreshes failed: {a}, {b}"),
    };
    ensure!(
        matches!(loser, Err(AuthError::InvalidRefreshToken)),
        "the losing refresh must be rejected, got {loser:?}"
    );

    let old = h.auth.refresh_tokens(&pair.refresh_token).await;
    ensure!(matches!(old, Err(AuthError::InvalidRefreshToken)));
    h.auth.refresh_tokens(&winner.refresh_token).await?;
    Ok(())
}

#[tokio::test]
async fn sequential_replay_of_a_rotated_token_is_rejected() -> Result<()> {
    let h = harness()?;
    let (_, pair) = h.confirmed_user("a@x.com").await?;

    let first = h.auth.refresh_tokens(&pair.refresh_token).await?;
    let replay = h.auth.refresh_tokens(&pair.refresh_token).await;
    ensure!(matches!(replay, Err(AuthError::InvalidRefreshToken)));
    h.auth.refresh_tokens(&first.refresh_token).await?;
    Ok(())
}
