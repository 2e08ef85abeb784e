pub mod payments;
pub mod settlement;
pub mod wallet_debit;

pub use payments::PaymentService;
pub use settlement::SettlementWorker;
pub use wallet_debit::WalletDebitService;
