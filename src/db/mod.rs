use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, ReturnDocument, ServerApi, ServerApiVersion},
    Client, ClientSession, Collection,
};
use std::time::Duration;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
};

const COUNTERS_COLLECTION: &str = "counters";
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct Database {
    client: Client,
    db_name: String,
}

impl Database {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let mut client_options = ClientOptions::parse(&config.mongo_conn_string).await?;

        let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
        client_options.server_api = Some(server_api);
        client_options.max_pool_size = Some(10);
        client_options.min_pool_size = Some(2);
        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        log::info!("Connected to MongoDB database '{}'", config.mongo_db_name);

        Ok(Self {
            client,
            db_name: config.mongo_db_name.clone(),
        })
    }

    pub fn get_collection<T>(&self, collection_name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.client
            .database(&self.db_name)
            .collection(collection_name)
    }

    /// Allocates the next integer id for `sequence` from the counters collection.
    pub async fn next_id(&self, sequence: &str) -> AppResult<i64> {
        self.next_ids(sequence, 1).await
    }

    /// Reserves `count` consecutive ids with a single `$inc` and returns the first one.
    pub async fn next_ids(&self, sequence: &str, count: usize) -> AppResult<i64> {
        let count = i64::try_from(count.max(1))
            .map_err(|_| AppError::InternalError("Id block is too large".to_string()))?;
        let counters: Collection<Document> = self.get_collection(COUNTERS_COLLECTION);

        let counter = counters
            .find_one_and_update(doc! { "_id": sequence }, doc! { "$inc": { "seq": count } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| {
                AppError::DatabaseError(format!("Sequence '{}' could not be allocated", sequence))
            })?;

        let last = counter
            .get_i64("seq")
            .map_err(|e| AppError::DatabaseError(format!("Invalid sequence '{}': {}", sequence, e)))?;
        Ok(first_of_block(last, count))
    }

    pub async fn start_transaction(&self) -> AppResult<ClientSession> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        Ok(session)
    }

    pub async fn health_check(&self) -> AppResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

}

/// First id of a block of `count` ids ending at `last`.
fn first_of_block(last: i64, count: i64) -> i64 {
    last - count + 1
}

/// Commits `session` when `result` is Ok, aborts it otherwise.
pub async fn finish_transaction<T>(
    mut session: ClientSession,
    result: AppResult<T>,
) -> AppResult<T> {
    match result {
        Ok(value) => {
            session.commit_transaction().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(abort_err) = session.abort_transaction().await {
                log::warn!("Failed to abort transaction: {}", abort_err);
            }
            Err(err)
        }
    }
}

pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_structure() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Database>();
    }

    #[test]
    fn test_id_block_starts_after_previous_counter() {
        // Counter was 7, then $inc by 3 left it at 10: ids 8, 9 and 10 are reserved.
        assert_eq!(first_of_block(10, 3), 8);
        assert_eq!(first_of_block(1, 1), 1);
    }
}
