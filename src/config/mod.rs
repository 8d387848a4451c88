pub mod rates;

pub use rates::RatesConfig;
