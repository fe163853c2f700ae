//! Account route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use super::page::Page;
use crate::error::AppError;
use crate::filters;
use crate::middleware::ActiveUser;
use crate::state::AppState;

/// Credit ledger row.
pub struct CreditLogView {
    pub date: String,
    /// Signed amount, with a `+` for additions.
    pub amount: String,
    pub negative: bool,
    pub kind: &'static str,
    pub reason: String,
}

/// Credit history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/credit.html")]
pub struct CreditTemplate {
    pub page: Page,
    pub balance: String,
    pub logs: Vec<CreditLogView>,
}

/// Display the credit balance and its history.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn credit(State(state): State<AppState>, ActiveUser(member): ActiveUser) -> Result<CreditTemplate, AppError> {
    let logs = state.profiles().credit_history(&member.auth).await?;

    let page = Page::new(&member.viewer, &state).await?;
    Ok(CreditTemplate {
        balance: member.profile.credit.format_amount(),
        logs: logs
            .into_iter()
            .map(|log| CreditLogView {
                date: log.created_at.format("%d/%m/%Y %H:%M").to_string(),
                amount: if log.amount.is_negative() {
                    log.amount.format_amount()
                } else {
                    format!("+{}", log.amount.format_amount())
                },
                negative: log.amount.is_negative(),
                kind: page.t(log.kind.as_str()),
                reason: log.reason,
            })
            .collect(),
        page,
    })
}
