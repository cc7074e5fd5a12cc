//! MongoDB adapter: one client plus one logical database handle.
//!
//! Transactions run on a `ClientSession`. The session is ended (dropped)
//! after every transaction, whether it committed or aborted.

use futures_util::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, ClientSession, Database};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::operation::{DocumentOperation, JsonObject};
use crate::db::handle::HandleSlot;
use crate::db::transaction::{TransactionControl, run_transaction};
use crate::db::{
    BackendKind, DatabaseAdapter, DbError, DbResult, MongoConfig, QueryResult, Queryable, Row,
};

const BACKEND: &str = "mongodb";

#[derive(Clone)]
struct Handle {
    client: Client,
    db: Database,
}

/// MongoDB adapter.
pub struct MongoAdapter {
    config: MongoConfig,
    handle: HandleSlot<Handle>,
}

impl MongoAdapter {
    pub fn new(config: MongoConfig) -> Self {
        Self {
            config,
            handle: HandleSlot::new("MongoDB"),
        }
    }

    async fn open(&self) -> mongodb::error::Result<Handle> {
        let mut options = ClientOptions::parse(&self.config.url).await?;
        options.max_pool_size = Some(self.config.pool_size());
        let client = Client::with_options(options)?;
        // The driver connects lazily; ping so a bad server fails here.
        ping(&client).await?;
        let db = client.database(&self.config.database);
        Ok(Handle { client, db })
    }

    /// Start a session and open a transaction on it.
    pub(crate) async fn begin(&self) -> DbResult<MongoTransaction> {
        let handle = self.handle.get()?;
        let mut session = handle.client.start_session().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "Failed to start session");
            DbError::connection(format!("MongoDB session failed: {}", e))
        })?;
        session.start_transaction().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "Failed to start transaction");
            DbError::query(
                format!("MongoDB operation failed: {}", e),
                Some("startTransaction"),
            )
        })?;
        Ok(MongoTransaction {
            db: handle.db,
            session: Mutex::new(session),
        })
    }
}

async fn ping(client: &Client) -> mongodb::error::Result<Document> {
    client.database("admin").run_command(doc! { "ping": 1 }).await
}

fn to_document(object: &JsonObject, description: &str) -> DbResult<Document> {
    bson::to_document(object).map_err(|e| {
        DbError::query(
            format!("MongoDB operation failed: invalid document: {}", e),
            Some(description),
        )
    })
}

fn bson_to_json(value: Bson) -> Value {
    value.into_relaxed_extjson()
}

fn document_to_row(document: Document) -> Row {
    match bson_to_json(Bson::Document(document)) {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// A converted operation, ready for the driver.
enum Prepared {
    Find(Document),
    InsertOne(Document),
    UpdateOne(Document, Document),
    DeleteOne(Document),
}

impl Prepared {
    fn new(operation: &DocumentOperation, description: &str) -> DbResult<Self> {
        Ok(match operation {
            DocumentOperation::Find(filter) => Prepared::Find(to_document(filter, description)?),
            DocumentOperation::InsertOne(document) => {
                Prepared::InsertOne(to_document(document, description)?)
            }
            DocumentOperation::UpdateOne { filter, update } => Prepared::UpdateOne(
                to_document(filter, description)?,
                to_document(update, description)?,
            ),
            DocumentOperation::DeleteOne(filter) => {
                Prepared::DeleteOne(to_document(filter, description)?)
            }
        })
    }
}

async fn run(
    db: &Database,
    session: Option<&mut ClientSession>,
    collection: &str,
    prepared: Prepared,
) -> mongodb::error::Result<QueryResult> {
    let coll = db.collection::<Document>(collection);

    let result = match prepared {
        Prepared::Find(filter) => {
            let documents: Vec<Document> = match session {
                Some(session) => {
                    let mut cursor = coll.find(filter).session(&mut *session).await?;
                    cursor.stream(&mut *session).try_collect().await?
                }
                None => coll.find(filter).await?.try_collect().await?,
            };
            QueryResult::from_rows(documents.into_iter().map(document_to_row).collect())
        }
        Prepared::InsertOne(document) => {
            let inserted = match session {
                Some(session) => coll.insert_one(document).session(session).await?,
                None => coll.insert_one(document).await?,
            };
            QueryResult::mutation(Some(bson_to_json(inserted.inserted_id)), 1)
        }
        Prepared::UpdateOne(filter, update) => {
            let updated = match session {
                Some(session) => coll.update_one(filter, update).session(session).await?,
                None => coll.update_one(filter, update).await?,
            };
            QueryResult::mutation(
                updated.upserted_id.map(bson_to_json),
                updated.modified_count,
            )
        }
        Prepared::DeleteOne(filter) => {
            let deleted = match session {
                Some(session) => coll.delete_one(filter).session(session).await?,
                None => coll.delete_one(filter).await?,
            };
            QueryResult::mutation(None, deleted.deleted_count)
        }
    };

    Ok(result)
}

async fn execute(
    db: &Database,
    session: Option<&mut ClientSession>,
    collection: &str,
    operation: &DocumentOperation,
) -> DbResult<QueryResult> {
    let description = format!("{}.{}", collection, operation.name());
    debug!(backend = BACKEND, collection, operation = ?operation, "Executing MongoDB operation");

    let prepared = Prepared::new(operation, &description)?;
    run(db, session, collection, prepared).await.map_err(|e| {
        error!(backend = BACKEND, collection, operation = ?operation, error = %e, "MongoDB operation failed");
        DbError::query(format!("MongoDB operation failed: {}", e), Some(&description))
    })
}

impl Queryable for MongoAdapter {
    type Params = DocumentOperation;
    type Transaction = MongoTransaction;

    fn kind(&self) -> BackendKind {
        BackendKind::MongoDb
    }

    /// `statement` names the collection.
    async fn query(&self, statement: &str, params: DocumentOperation) -> DbResult<QueryResult> {
        let handle = self.handle.get()?;
        execute(&handle.db, None, statement, &params).await
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&MongoTransaction) -> DbResult<T>,
    {
        run_transaction(self.begin().await?, body).await
    }

    async fn health_check(&self) -> bool {
        match self.handle.get() {
            Ok(handle) => ping(&handle.client).await.is_ok(),
            Err(_) => false,
        }
    }
}

impl DatabaseAdapter for MongoAdapter {
    async fn connect(&self) -> DbResult<()> {
        if self.handle.is_set() {
            warn!(backend = BACKEND, "Already connected to MongoDB");
            return Ok(());
        }

        let handle = self.open().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "Failed to connect to MongoDB");
            DbError::connection(format!("MongoDB connection failed: {}", e))
        })?;

        if let Some(extra) = self.handle.install(handle)? {
            warn!(backend = BACKEND, "Already connected to MongoDB, closing the extra client");
            extra.client.shutdown().await;
            return Ok(());
        }
        info!(backend = BACKEND, database = %self.config.database, "Connected to MongoDB");
        Ok(())
    }

    async fn disconnect(&self) -> DbResult<()> {
        if let Some(handle) = self.handle.take()? {
            handle.client.shutdown().await;
            info!(backend = BACKEND, "Disconnected from MongoDB");
        }
        Ok(())
    }
}

/// A MongoDB transaction bound to one client session.
///
/// Every operation issued through this handle runs inside the session. If
/// the context is dropped mid-transaction, the driver aborts the transaction
/// when the session is dropped.
pub struct MongoTransaction {
    db: Database,
    session: Mutex<ClientSession>,
}

impl Queryable for MongoTransaction {
    type Params = DocumentOperation;
    type Transaction = MongoTransaction;

    fn kind(&self) -> BackendKind {
        BackendKind::MongoDb
    }

    async fn query(&self, statement: &str, params: DocumentOperation) -> DbResult<QueryResult> {
        let mut session = self.session.lock().await;
        execute(&self.db, Some(&mut *session), statement, &params).await
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&MongoTransaction) -> DbResult<T>,
    {
        debug!(backend = BACKEND, "Reusing open session");
        body(self).await
    }

    async fn health_check(&self) -> bool {
        ping(self.db.client()).await.is_ok()
    }
}

impl TransactionControl for MongoTransaction {
    async fn commit(&self) -> DbResult<()> {
        let mut session = self.session.lock().await;
        session.commit_transaction().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "Commit failed");
            DbError::query(
                format!("MongoDB operation failed: {}", e),
                Some("commitTransaction"),
            )
        })
    }

    async fn rollback(&self) -> DbResult<()> {
        let mut session = self.session.lock().await;
        session.abort_transaction().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "Abort failed");
            DbError::query(
                format!("MongoDB operation failed: {}", e),
                Some("abortTransaction"),
            )
        })
    }

    /// Ends the session. The driver ends a session when it is dropped.
    async fn release(self) {
        drop(self.session.into_inner());
        debug!(backend = BACKEND, "Session ended");
    }
}
