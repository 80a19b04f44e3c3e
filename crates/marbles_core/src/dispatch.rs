//! Function dispatch.
//!
//! The host calls the registry with a function name, positional string
//! arguments and a transient map. [`MarblesContract`] routes the call to the
//! repository or the query executor and wraps the outcome in a [`Response`].

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::input::{
    decode_transient, CreateMarble, DeleteMarble, Mutation, TransferMarble, TransientMap,
};
use crate::query::QueryExecutor;
use crate::repository::MarbleRepository;
use marbles_storage::KeyValueStore;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info_span, warn};
use uuid::Uuid;

/// An invokable registry function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// Create a marble from the `marble` transient entry.
    Create,
    /// Read a marble record.
    ReadGeneral,
    /// Read the private details of a marble.
    ReadDetail,
    /// Change a marble's owner from the `marble_owner` transient entry.
    Transfer,
    /// Delete a marble from the `marble_delete` transient entry.
    Delete,
    /// Marbles owned by an owner.
    QueryByOwner,
    /// Entries in a key range.
    QueryByRange,
    /// Entries matching a predicate expression.
    QueryByPredicate,
    /// Marbles of a color, through the color index.
    QueryByColor,
}

impl Function {
    /// Every function, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Create,
        Self::ReadGeneral,
        Self::ReadDetail,
        Self::Transfer,
        Self::Delete,
        Self::QueryByOwner,
        Self::QueryByRange,
        Self::QueryByPredicate,
        Self::QueryByColor,
    ];

    /// Returns the canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::ReadGeneral => "readGeneral",
            Self::ReadDetail => "readDetail",
            Self::Transfer => "transfer",
            Self::Delete => "delete",
            Self::QueryByOwner => "queryByOwner",
            Self::QueryByRange => "queryByRange",
            Self::QueryByPredicate => "queryByPredicate",
            Self::QueryByColor => "queryByColor",
        }
    }

    /// Returns the older name still accepted for this function, if any.
    #[must_use]
    pub const fn alias(self) -> Option<&'static str> {
        match self {
            Self::Create => Some("initMarble"),
            Self::ReadGeneral => Some("readMarble"),
            Self::ReadDetail => Some("readMarblePrivateDetails"),
            Self::Transfer => Some("transferMarble"),
            Self::QueryByOwner => Some("queryMarblesByOwner"),
            Self::QueryByRange => Some("getMarblesByRange"),
            Self::QueryByPredicate => Some("queryMarbles"),
            Self::Delete | Self::QueryByColor => None,
        }
    }

    /// Returns true if the function writes to the store.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Create | Self::Transfer | Self::Delete)
    }

    /// Checks the positional argument count.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArguments`] if the count does not fit.
    pub fn check_args(self, args: &[String]) -> CoreResult<()> {
        let actual = args.len();
        let (ok, expected) = match self {
            Self::Create | Self::Transfer | Self::Delete => (
                actual == 0,
                "0, marble data must be passed in the transient map",
            ),
            Self::ReadGeneral | Self::ReadDetail => (actual == 1, "1, the marble name"),
            Self::QueryByRange => (actual >= 2, "2, the start and end keys"),
            Self::QueryByOwner => (actual >= 1, "1, the owner"),
            Self::QueryByPredicate => (actual >= 1, "1, the query expression"),
            Self::QueryByColor => (actual >= 1, "1, the color"),
        };
        if ok {
            Ok(())
        } else {
            Err(CoreError::InvalidArguments { expected, actual })
        }
    }
}

impl FromStr for Function {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s || f.alias() == Some(s))
            .ok_or_else(|| CoreError::UnknownFunction { name: s.to_string() })
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One call into the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Function name, canonical or alias.
    pub function: String,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Side-channel input, not part of the recorded call.
    pub transient: TransientMap,
}

impl Invocation {
    /// Creates an invocation of `function` with no arguments.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Self::default()
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends positional arguments.
    #[must_use]
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets a transient entry.
    #[must_use]
    pub fn transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient.insert(key.into(), value.into());
        self
    }
}

/// Status of a successful response.
pub const STATUS_OK: u16 = 200;

/// Status of a failed response.
pub const STATUS_ERROR: u16 = 500;

/// Outcome of an invocation as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// [`STATUS_OK`] or [`STATUS_ERROR`].
    pub status: u16,
    /// Result bytes, empty for mutations and failures.
    pub payload: Vec<u8>,
    /// Error message, empty on success.
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    #[serde(rename = "Error")]
    error: &'a str,
}

impl Response {
    /// Creates a successful response.
    #[must_use]
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            status: STATUS_OK,
            payload,
            message: String::new(),
        }
    }

    /// Creates a failed response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR,
            payload: Vec::new(),
            message: message.into(),
        }
    }

    /// Returns true for a successful response.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Renders the message as `{"Error":"<message>"}`.
    #[must_use]
    pub fn error_json(&self) -> String {
        serde_json::to_string(&ErrorBody {
            error: &self.message,
        })
        .unwrap_or_else(|_| String::from("{}"))
    }
}

/// The registry entry point.
#[derive(Debug, Clone, Default)]
pub struct MarblesContract {
    config: Config,
}

impl MarblesContract {
    /// Creates a contract with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one invocation against `store`.
    ///
    /// Mutations return an empty payload. Reads return the stored bytes and
    /// queries return the JSON result envelope.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Writes issued before a failing
    /// step are not undone; the caller's transaction is expected to abort.
    pub fn execute<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        invocation: &Invocation,
    ) -> CoreResult<Vec<u8>> {
        let span = info_span!(
            "invoke",
            function = %invocation.function,
            request_id = %Uuid::new_v4()
        );
        let _guard = span.enter();

        let function: Function = invocation.function.parse()?;
        function.check_args(&invocation.args)?;
        debug!(%function, args = invocation.args.len(), "dispatching");

        let args = &invocation.args;
        match function {
            Function::Create | Function::Transfer | Function::Delete => {
                let mutation = decode_mutation(function, &invocation.transient)?;
                MarbleRepository::new(store, &self.config).apply(&mutation)?;
                Ok(Vec::new())
            }
            Function::ReadGeneral => {
                let repo = MarbleRepository::new(store, &self.config);
                Ok(repo.read_marble(&args[0])?.to_vec())
            }
            Function::ReadDetail => {
                let repo = MarbleRepository::new(store, &self.config);
                Ok(repo.read_private_details(&args[0])?.to_vec())
            }
            Function::QueryByOwner => QueryExecutor::new(&*store, &self.config).query_by_owner(&args[0]),
            Function::QueryByRange => {
                QueryExecutor::new(&*store, &self.config).range_query(&args[0], &args[1])
            }
            Function::QueryByPredicate => {
                QueryExecutor::new(&*store, &self.config).rich_query(&args[0])
            }
            Function::QueryByColor => QueryExecutor::new(&*store, &self.config).query_by_color(&args[0]),
        }
    }

    /// Runs one invocation and converts the outcome into a [`Response`].
    pub fn invoke<S: KeyValueStore + ?Sized>(&self, store: &mut S, invocation: &Invocation) -> Response {
        match self.execute(store, invocation) {
            Ok(payload) => Response::ok(payload),
            Err(e) => {
                if e.is_caller_error() {
                    warn!(function = %invocation.function, error = %e, "invocation rejected");
                } else {
                    error!(function = %invocation.function, error = %e, "invocation failed");
                }
                Response::error(e.to_string())
            }
        }
    }
}

fn decode_mutation(function: Function, transient: &TransientMap) -> CoreResult<Mutation> {
    match function {
        Function::Create => Ok(Mutation::Create(decode_transient::<CreateMarble>(transient)?)),
        Function::Transfer => Ok(Mutation::Transfer(decode_transient::<TransferMarble>(transient)?)),
        Function::Delete => Ok(Mutation::Delete(decode_transient::<DeleteMarble>(transient)?)),
        other => Err(CoreError::UnknownFunction {
            name: other.name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marbles_storage::InMemoryStore;
    use serde_json::Value;

    const M1: &str = r#"{"name":"m1","color":"blue","size":35,"owner":"alice","price":99}"#;

    fn create(name: &str, color: &str, owner: &str) -> Invocation {
        let payload = format!(
            r#"{{"name":"{name}","color":"{color}","size":10,"owner":"{owner}","price":5}}"#
        );
        Invocation::new("create").transient("marble", payload)
    }

    #[test]
    fn parses_canonical_names_and_aliases() {
        for function in Function::ALL {
            assert_eq!(function.name().parse::<Function>().unwrap(), function);
            if let Some(alias) = function.alias() {
                assert_eq!(alias.parse::<Function>().unwrap(), function);
            }
        }
        assert!(matches!(
            "burnMarble".parse::<Function>(),
            Err(CoreError::UnknownFunction { name }) if name == "burnMarble"
        ));
    }

    #[test]
    fn argument_counts() {
        let args = |n: usize| vec![String::from("x"); n];
        assert!(Function::Create.check_args(&args(0)).is_ok());
        assert!(Function::Create.check_args(&args(1)).is_err());
        assert!(Function::ReadGeneral.check_args(&args(1)).is_ok());
        assert!(Function::ReadGeneral.check_args(&args(2)).is_err());
        assert!(Function::ReadDetail.check_args(&args(0)).is_err());
        assert!(Function::QueryByRange.check_args(&args(1)).is_err());
        assert!(Function::QueryByRange.check_args(&args(3)).is_ok());
        assert!(Function::QueryByOwner.check_args(&args(0)).is_err());
        assert!(Function::QueryByPredicate.check_args(&args(2)).is_ok());
    }

    #[test]
    fn create_then_read_both_collections() {
        let contract = MarblesContract::default();
        let mut store = InMemoryStore::new();

        let response = contract.invoke(&mut store, &Invocation::new("initMarble").transient("marble", M1));
        assert!(response.is_ok(), "{}", response.message);
        assert!(response.payload.is_empty());

        let general = contract
            .execute(&mut store, &Invocation::new("readGeneral").arg("m1"))
            .unwrap();
        let general: Value = serde_json::from_slice(&general).unwrap();
        assert_eq!(general["docType"], "marble");
        assert_eq!(general["owner"], "alice");
        assert!(general.get("price").is_none());

        let detail = contract
            .execute(&mut store, &Invocation::new("readMarblePrivateDetails").arg("m1"))
            .unwrap();
        let detail: Value = serde_json::from_slice(&detail).unwrap();
        assert_eq!(detail["price"], 99);
    }

    #[test]
    fn mutations_reject_positional_arguments() {
        let contract = MarblesContract::default();
        let mut store = InMemoryStore::new();
        let err = contract
            .execute(&mut store, &create("m1", "blue", "alice").arg("m1"))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArguments { actual: 1, .. }));
        assert!(store.is_empty("collectionMarbles"));
    }

    #[test]
    fn duplicate_create_fails() {
        let contract = MarblesContract::default();
        let mut store = InMemoryStore::new();
        contract.execute(&mut store, &create("m1", "blue", "alice")).unwrap();
        let err = contract
            .execute(&mut store, &create("m1", "red", "bob"))
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { name } if name == "m1"));
    }

    #[test]
    fn transfer_and_owner_query() {
        let contract = MarblesContract::default();
        let mut store = InMemoryStore::new();
        contract.execute(&mut store, &create("m1", "blue", "alice")).unwrap();

        let owned = |store: &mut InMemoryStore, owner: &str| -> Vec<Value> {
            let bytes = contract
                .execute(store, &Invocation::new("queryByOwner").arg(owner))
                .unwrap();
            serde_json::from_slice(&bytes).unwrap()
        };
        assert_eq!(owned(&mut store, "alice").len(), 1);

        contract
            .execute(
                &mut store,
                &Invocation::new("transferMarble").transient("marble_owner", r#"{"name":"m1","owner":"bob"}"#),
            )
            .unwrap();
        assert!(owned(&mut store, "alice").is_empty());
        assert_eq!(owned(&mut store, "bob")[0]["Key"], "m1");
    }

    #[test]
    fn delete_then_reads_fail() {
        let contract = MarblesContract::default();
        let mut store = InMemoryStore::new();
        contract.execute(&mut store, &create("m1", "blue", "alice")).unwrap();
        contract
            .execute(
                &mut store,
                &Invocation::new("delete").transient("marble_delete", r#"{"name":"m1"}"#),
            )
            .unwrap();

        let response = contract.invoke(&mut store, &Invocation::new("readGeneral").arg("m1"));
        assert_eq!(response.status, STATUS_ERROR);
        assert_eq!(response.message, "marble does not exist: m1");
        assert_eq!(response.error_json(), r#"{"Error":"marble does not exist: m1"}"#);

        let colors = contract
            .execute(&mut store, &Invocation::new("queryByColor").arg("blue"))
            .unwrap();
        assert_eq!(colors, b"[]");
        assert!(store.is_empty("collectionMarbles"));
        assert!(store.is_empty("collectionMarblePrivateDetails"));
    }

    #[test]
    fn range_and_predicate_queries() {
        let contract = MarblesContract::default();
        let mut store = InMemoryStore::new();
        for (name, color) in [("m1", "blue"), ("m2", "red"), ("m3", "blue")] {
            contract.execute(&mut store, &create(name, color, "alice")).unwrap();
        }

        let range = contract
            .execute(&mut store, &Invocation::new("getMarblesByRange").args(["m1", "m3"]))
            .unwrap();
        let range: Vec<Value> = serde_json::from_slice(&range).unwrap();
        assert_eq!(range.len(), 2);

        let predicate = contract
            .execute(
                &mut store,
                &Invocation::new("queryMarbles").arg(r#"{"selector":{"color":"blue"}}"#),
            )
            .unwrap();
        let predicate: Vec<Value> = serde_json::from_slice(&predicate).unwrap();
        assert_eq!(predicate.len(), 2);
    }

    #[test]
    fn unknown_function_response() {
        let contract = MarblesContract::default();
        let mut store = InMemoryStore::new();
        let response = contract.invoke(&mut store, &Invocation::new("nope"));
        assert!(!response.is_ok());
        assert_eq!(response.message, "received unknown function invocation: nope");
    }

    #[test]
    fn error_json_escapes_message() {
        let response = Response::error(r#"bad "input""#);
        let parsed: Value = serde_json::from_str(&response.error_json()).unwrap();
        assert_eq!(parsed["Error"], r#"bad "input""#);
    }
}
