//! HTTP adapter for a PostgREST/GoTrue/storage-API style hosted backend.

use super::{
    AuthEvent, AuthListener, AuthSession, AuthSubscription, Direction, Filter, RemoteAuth,
    RemoteError, RemoteFunctions, RemoteStorage, RemoteTables, Row, Select,
};
use crate::config::RemoteConfig;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, AuthListener>,
}

///
/// RestRemote
///

pub struct RestRemote {
    client: Client,
    base: Url,
    anon_key: String,
    session: Mutex<Option<AuthSession>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl RestRemote {
    pub fn new(config: &RemoteConfig) -> Result<Arc<Self>, RemoteError> {
        let base = Url::parse(&config.base_url)
            .map_err(|err| RemoteError::network(format!("invalid base url: {err}")))?;

        Ok(Arc::new(Self {
            client: Client::new(),
            base,
            anon_key: config.anon_key.clone(),
            session: Mutex::new(None),
            listeners: Arc::default(),
        }))
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base
            .join(path)
            .map_err(|err| RemoteError::network(format!("invalid endpoint {path}: {err}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = lock(&self.session)
            .as_ref()
            .map_or_else(|| self.anon_key.clone(), |s| s.access_token.clone());

        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn emit(&self, event: &AuthEvent) {
        let listeners: Vec<AuthListener> =
            lock(&self.listeners).entries.values().cloned().collect();
        for listener in listeners {
            listener(event.clone());
        }
    }

    /// Build the table read URL for a select request.
    pub(crate) fn select_url(&self, table: &str, query: &Select) -> Result<Url, RemoteError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for filter in &query.filters {
                match filter {
                    Filter::Eq { column, value } => {
                        let text = value.scalar_text();
                        match text {
                            Some(text) => pairs.append_pair(column, &format!("eq.{text}")),
                            None => pairs.append_pair(column, "is.null"),
                        };
                    }
                    Filter::AnyContainsCi { columns, needle } => {
                        let operand = ilike_operand(needle);
                        let clauses: Vec<String> = columns
                            .iter()
                            .map(|column| format!("{column}.ilike.{operand}"))
                            .collect();
                        pairs.append_pair("or", &format!("({})", clauses.join(",")));
                    }
                }
            }
            // id breaks ties, matching the memory backend
            let mut order: Vec<String> = query
                .order
                .iter()
                .map(|o| match o.direction {
                    Direction::Asc => format!("{}.asc.nullslast", o.column),
                    Direction::Desc => format!("{}.desc.nullslast", o.column),
                })
                .collect();
            if !query.order.iter().any(|o| o.column == "id") {
                order.push("id.asc".into());
            }
            pairs.append_pair("order", &order.join(","));
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }

        Ok(url)
    }

    fn row_url(&self, table: &str, id: &str) -> Result<Url, RemoteError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        Ok(url)
    }
}

/// Quoted `ilike` operand matching `needle` literally anywhere in the value.
///
/// Quoting keeps `,` `(` `)` `.` inside the `or` list; `%` and `_` are
/// escaped so they do not act as wildcards.
fn ilike_operand(needle: &str) -> String {
    let mut operand = String::with_capacity(needle.len() + 4);
    operand.push_str("\"*");
    for ch in needle.chars() {
        match ch {
            // a literal backslash is escaped for LIKE, then for the quoted value
            '\\' => operand.push_str("\\\\\\\\"),
            '%' | '_' => {
                operand.push_str("\\\\");
                operand.push(ch);
            }
            '"' => operand.push_str("\\\""),
            _ => operand.push(ch),
        }
    }
    operand.push_str("*\"");

    operand
}

///
/// ErrorBody
///
/// Union of the error payload shapes the hosted services return.
///

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    code: Option<serde_json::Value>,
}

async fn send(builder: RequestBuilder) -> Result<Response, RemoteError> {
    let response = builder
        .send()
        .await
        .map_err(|err| RemoteError::network(err.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .or(body.msg)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    let mut err = RemoteError::response(status.as_u16(), message);
    err.code = body.code.map(|code| match code {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    });

    Err(err)
}

async fn json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|err| RemoteError::network(format!("malformed response: {err}")))
}

fn first_row(rows: Vec<Row>, table: &str) -> Result<Row, RemoteError> {
    rows.into_iter().next().ok_or_else(|| {
        RemoteError::response(406, format!("no row returned from {table}")).with_code("PGRST116")
    })
}

#[async_trait]
impl RemoteTables for RestRemote {
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, RemoteError> {
        let url = self.select_url(table, query)?;
        debug!(%url, "rest select");

        json(send(self.request(Method::GET, url)).await?).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, RemoteError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let builder = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&[row]);

        first_row(json(send(builder).await?).await?, table)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, RemoteError> {
        let builder = self
            .request(Method::PATCH, self.row_url(table, id)?)
            .header("Prefer", "return=representation")
            .json(&patch);

        first_row(json(send(builder).await?).await?, table)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        send(self.request(Method::DELETE, self.row_url(table, id)?)).await?;

        Ok(())
    }
}

#[async_trait]
impl RemoteStorage for RestRemote {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), RemoteError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{path}"))?;
        let builder = self
            .request(Method::POST, url)
            .header("x-upsert", "true")
            .header(
                "content-type",
                content_type.unwrap_or("application/octet-stream"),
            )
            .body(bytes);
        send(builder).await?;

        Ok(())
    }

    fn public_locator(&self, bucket: &str, path: &str) -> Option<String> {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        self.endpoint(&format!(
            "storage/v1/object/public/{bucket}/{}",
            encoded.join("/")
        ))
        .ok()
        .map(String::from)
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), RemoteError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}"))?;
        let builder = self
            .request(Method::DELETE, url)
            .json(&serde_json::json!({ "prefixes": paths }));
        send(builder).await?;

        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, RemoteError> {
        #[derive(Deserialize)]
        struct Entry {
            name: String,
        }

        let url = self.endpoint(&format!("storage/v1/object/list/{bucket}"))?;
        let builder = self
            .request(Method::POST, url)
            .json(&serde_json::json!({ "prefix": prefix }));
        let entries: Vec<Entry> = json(send(builder).await?).await?;
        let prefix = prefix.trim_end_matches('/');

        Ok(entries
            .into_iter()
            .map(|entry| {
                if prefix.is_empty() {
                    entry.name
                } else {
                    format!("{prefix}/{}", entry.name)
                }
            })
            .collect())
    }
}

///
/// TokenResponse
///

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: String,
}

#[async_trait]
impl RemoteAuth for RestRemote {
    async fn sign_in(&self, email: &str, secret: &str) -> Result<AuthSession, RemoteError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let builder = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": secret }));
        let token: TokenResponse = json(send(builder).await?).await?;

        let session = AuthSession {
            principal_id: token.user.id,
            email: if token.user.email.is_empty() {
                email.to_string()
            } else {
                token.user.email
            },
            access_token: token.access_token,
        };
        *lock(&self.session) = Some(session.clone());
        self.emit(&AuthEvent::SignedIn(session.clone()));

        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        let had_session = lock(&self.session).is_some();
        let result = match self.endpoint("auth/v1/logout") {
            Ok(url) if had_session => send(self.request(Method::POST, url)).await.map(|_| ()),
            Ok(_) => Ok(()),
            Err(err) => Err(err),
        };

        // the local session is dropped even when the revoke call fails
        lock(&self.session).take();
        if had_session {
            self.emit(&AuthEvent::SignedOut);
        }

        result
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, RemoteError> {
        Ok(lock(&self.session).clone())
    }

    fn subscribe(&self, listener: AuthListener) -> AuthSubscription {
        let id = {
            let mut listeners = lock(&self.listeners);
            listeners.next_id += 1;
            let id = listeners.next_id;
            listeners.entries.insert(id, listener);
            id
        };
        let registry = Arc::clone(&self.listeners);

        AuthSubscription::new(move || {
            lock(&registry).entries.remove(&id);
        })
    }
}

#[async_trait]
impl RemoteFunctions for RestRemote {
    async fn invoke(
        &self,
        name: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        let url = self.endpoint(&format!("functions/v1/{name}"))?;

        json(send(self.request(Method::POST, url).json(&body)).await?).await
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;

    fn remote() -> Arc<RestRemote> {
        RestRemote::new(&RemoteConfig {
            base_url: "https://assoc.example.org/".into(),
            anon_key: "anon".into(),
        })
        .unwrap()
    }

    #[test]
    fn select_url_encodes_filters_order_and_limit() {
        let query = Select::new()
            .any_contains_ci(["name", "email"], "ana")
            .eq("status", "Active")
            .order_by("name", Direction::Asc)
            .limit(50);

        let url = remote().select_url("members", &query).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/rest/v1/members");
        assert!(pairs.contains(&(
            "or".into(),
            r#"(name.ilike."*ana*",email.ilike."*ana*")"#.into()
        )));
        assert!(pairs.contains(&("status".into(), "eq.Active".into())));
        assert!(pairs.contains(&("order".into(), "name.asc.nullslast,id.asc".into())));
        assert!(pairs.contains(&("limit".into(), "50".into())));
    }

    #[test]
    fn unordered_select_still_orders_by_id() {
        let url = remote().select_url("events", &Select::new()).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("order".into(), "id.asc".into())));
    }

    #[test]
    fn search_needle_is_quoted_inside_the_or_list() {
        let query = Select::new().any_contains_ci(["name", "email"], "Silva, Ana (jr.)");
        let url = remote().select_url("members", &query).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&(
            "or".into(),
            r#"(name.ilike."*Silva, Ana (jr.)*",email.ilike."*Silva, Ana (jr.)*")"#.into()
        )));
    }

    #[test]
    fn like_wildcards_and_quotes_in_needle_are_escaped() {
        assert_eq!(ilike_operand("50%_off"), r#""*50\\%\\_off*""#);
        assert_eq!(ilike_operand(r#"say "hi""#), r#""*say \"hi\"*""#);
        assert_eq!(ilike_operand(r"a\b"), r#""*a\\\\b*""#);
    }

    #[test]
    fn null_equality_uses_is_operator() {
        let query = Select::new().eq("member_id", crate::value::Value::Null);
        let url = remote().select_url("transactions", &query).unwrap();

        assert!(url.query().unwrap_or_default().contains("member_id=is.null"));
    }

    #[test]
    fn public_locator_is_percent_encoded() {
        let locator = remote()
            .public_locator("documents", "u1/17_annual report.pdf")
            .unwrap();

        assert_eq!(
            locator,
            "https://assoc.example.org/storage/v1/object/public/documents/u1/17_annual%20report.pdf"
        );
    }
}
