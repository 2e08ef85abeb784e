pub mod in_memory;
pub mod postgres_append_stores;
pub mod postgres_transaction_store;
pub mod postgres_wallet_store;

pub use in_memory::{
    InMemoryEconomicEventAppender, InMemoryLedgerAppender, InMemoryTransactionStore,
    InMemoryWalletStore,
};
pub use postgres_append_stores::{PostgresEconomicEventAppender, PostgresLedgerAppender};
pub use postgres_transaction_store::PostgresTransactionStore;
pub use postgres_wallet_store::PostgresWalletStore;
