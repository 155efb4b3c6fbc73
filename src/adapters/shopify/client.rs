//! Shopify store-credit client.
//!
//! Shopify is the system of record for store-credit balances. This client
//! reads balances for the dashboard and pushes credited batch totals as
//! store-credit adjustments.
//!
//! Balance reads keep a last-known cache per member. When Shopify is
//! unreachable the cached balance is returned marked stale, so the dashboard
//! degrades instead of failing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::dashboard::StoreCreditBalance;
use crate::domain::foundation::{BatchId, DomainError, MemberId, Money};
use crate::ports::{MemberRepository, StoreCreditGateway};

/// Shopify Admin API configuration.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Admin API access token (shpat_...).
    access_token: SecretString,

    /// Base URL, e.g. `https://my-shop.myshopify.com/admin/api/2024-01`.
    api_base_url: String,
}

impl ShopifyConfig {
    pub fn new(access_token: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            api_base_url: api_base_url.into(),
        }
    }
}

/// Store-credit gateway backed by the Shopify Admin API.
pub struct ShopifyStoreCreditClient {
    config: ShopifyConfig,
    http_client: reqwest::Client,

    /// Resolves members to their linked Shopify customer ids.
    members: Arc<dyn MemberRepository>,

    /// Last successfully fetched balance per member.
    balance_cache: Mutex<HashMap<MemberId, StoreCreditBalance>>,
}

#[derive(Debug, Deserialize)]
struct StoreCreditAccountsResponse {
    store_credit_accounts: Vec<StoreCreditAccount>,
}

#[derive(Debug, Deserialize)]
struct StoreCreditAccount {
    balance: StoreCreditAmount,
}

#[derive(Debug, Deserialize)]
struct StoreCreditAmount {
    /// Decimal string, e.g. "42.50".
    amount: String,
    currency_code: String,
}

#[derive(Debug, Serialize)]
struct CreditAdjustmentRequest<'a> {
    customer_id: &'a str,
    /// Decimal string in major units.
    amount: String,
    currency_code: &'a str,
    /// Unique per (member, batch); Shopify dedupes repeated pushes on it.
    idempotency_key: String,
    note: String,
}

impl ShopifyStoreCreditClient {
    pub fn new(config: ShopifyConfig, members: Arc<dyn MemberRepository>) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            members,
            balance_cache: Mutex::new(HashMap::new()),
        }
    }

    async fn customer_id_for(&self, member_id: MemberId) -> Result<Option<String>, DomainError> {
        let member = self.members.find_by_id(member_id).await?;
        Ok(member.and_then(|m| m.commerce_customer_id))
    }

    fn cached_balance(&self, member_id: MemberId) -> Option<StoreCreditBalance> {
        match self.balance_cache.lock() {
            Ok(cache) => cache.get(&member_id).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&member_id).cloned(),
        }
    }

    fn store_balance(&self, member_id: MemberId, balance: StoreCreditBalance) {
        match self.balance_cache.lock() {
            Ok(mut cache) => {
                cache.insert(member_id, balance);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(member_id, balance);
            }
        }
    }

    /// Degraded result for a failed fetch: last-known balance marked stale,
    /// or the zero "unknown" balance when nothing was ever fetched.
    fn degrade(&self, member_id: MemberId) -> StoreCreditBalance {
        self.cached_balance(member_id)
            .map(StoreCreditBalance::into_stale)
            .unwrap_or_else(StoreCreditBalance::unknown)
    }

    async fn fetch_remote_balance(
        &self,
        customer_id: &str,
    ) -> Result<StoreCreditBalance, DomainError> {
        let url = format!(
            "{}/customers/{}/store_credit_accounts.json",
            self.config.api_base_url, customer_id
        );

        let response = self
            .http_client
            .get(&url)
            .header(
                "X-Shopify-Access-Token",
                self.config.access_token.expose_secret(),
            )
            .send()
            .await
            .map_err(|e| DomainError::external_unavailable("commerce_platform", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, error = %body, "Shopify balance fetch failed");
            return Err(DomainError::external_unavailable(
                "commerce_platform",
                format!("Shopify API error ({}): {}", status, body),
            ));
        }

        let accounts: StoreCreditAccountsResponse = response.json().await.map_err(|e| {
            DomainError::external_unavailable(
                "commerce_platform",
                format!("Failed to parse Shopify response: {}", e),
            )
        })?;

        let Some(account) = accounts.store_credit_accounts.first() else {
            // Customer exists but has no store-credit account yet.
            return Ok(StoreCreditBalance::fresh(Money::ZERO, "USD"));
        };

        let amount = parse_decimal_amount(&account.balance.amount).ok_or_else(|| {
            DomainError::external_unavailable(
                "commerce_platform",
                format!("Unparseable balance amount: {}", account.balance.amount),
            )
        })?;

        Ok(StoreCreditBalance::fresh(
            amount,
            &account.balance.currency_code,
        ))
    }
}

/// Parses a Shopify decimal amount string ("42.50") into minor units.
fn parse_decimal_amount(raw: &str) -> Option<Money> {
    let (major, minor) = match raw.split_once('.') {
        Some((major, minor)) => (major, minor),
        None => (raw, ""),
    };

    let negative = major.starts_with('-');
    let major: i64 = major.parse().ok()?;

    let minor: i64 = match minor.len() {
        0 => 0,
        1 => minor.parse::<i64>().ok()? * 10,
        2 => minor.parse().ok()?,
        _ => return None,
    };

    let cents = major.abs() * 100 + minor;
    Some(Money::from_cents(if negative { -cents } else { cents }))
}

/// Formats minor units as a Shopify decimal amount string.
fn format_decimal_amount(amount: Money) -> String {
    let sign = if amount.cents() < 0 { "-" } else { "" };
    let abs = amount.cents().unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[async_trait]
impl StoreCreditGateway for ShopifyStoreCreditClient {
    async fn fetch_balance(
        &self,
        member_id: MemberId,
    ) -> Result<StoreCreditBalance, DomainError> {
        let Some(customer_id) = self.customer_id_for(member_id).await? else {
            // No linked Shopify customer yet; the balance is simply unknown.
            tracing::debug!(%member_id, "no linked commerce customer, balance unknown");
            return Ok(StoreCreditBalance::unknown());
        };

        match self.fetch_remote_balance(&customer_id).await {
            Ok(balance) => {
                self.store_balance(member_id, balance.clone());
                Ok(balance)
            }
            Err(err) => {
                tracing::warn!(%member_id, error = %err, "balance fetch failed, degrading to last known");
                Ok(self.degrade(member_id))
            }
        }
    }

    async fn push_batch_credit(
        &self,
        member_id: MemberId,
        batch_id: BatchId,
        amount: Money,
    ) -> Result<(), DomainError> {
        let customer_id = self.customer_id_for(member_id).await?.ok_or_else(|| {
            DomainError::invariant(format!(
                "member {} has no linked commerce customer to credit",
                member_id
            ))
        })?;

        let url = format!(
            "{}/store_credit_adjustments.json",
            self.config.api_base_url
        );

        let body = CreditAdjustmentRequest {
            customer_id: &customer_id,
            amount: format_decimal_amount(amount),
            currency_code: "USD",
            idempotency_key: format!("batch_credit:{}:{}", member_id, batch_id),
            note: format!("Trade-in bonus for batch {}", batch_id),
        };

        let response = self
            .http_client
            .post(&url)
            .header(
                "X-Shopify-Access-Token",
                self.config.access_token.expose_secret(),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::external_unavailable("commerce_platform", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(
                %member_id,
                %batch_id,
                status = %status,
                error = %text,
                "Shopify credit push failed"
            );
            return Err(DomainError::external_unavailable(
                "commerce_platform",
                format!("Shopify API error ({}): {}", status, text),
            ));
        }

        tracing::info!(
            %member_id,
            %batch_id,
            amount = %amount,
            "pushed batch credit to Shopify"
        );
        Ok(())
    }
}
