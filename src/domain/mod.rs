pub mod events;
pub mod ledger;
pub mod money;
pub mod transaction;
pub mod wallet;

pub use events::{EconomicEventEnvelope, EconomicEventType, EventActor, EventCorrelation, EventSource};
pub use ledger::{LedgerEntry, LedgerEntryType};
pub use money::{MajorAmount, MinorUnits};
pub use transaction::{Transaction, TransactionMetadata, TransactionStatus, TransactionType};
pub use wallet::{Wallet, WalletEntryKind, WalletTransaction};
