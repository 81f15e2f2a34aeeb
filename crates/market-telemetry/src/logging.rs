//! Structured logging macros.
//!
//! Every line carries a `component` field, and market or transaction events
//! carry their identifiers under fixed field names so log queries can join
//! on them.

/// Log with a component field.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a market-related event with standard fields.
#[macro_export]
macro_rules! log_market_event {
    ($level:ident, $component:expr, $msg:expr, $market_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            market_id = $market_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a transaction-related event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $component:expr, $msg:expr, $tx_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            tx_hash = %$tx_hash,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand() {
        let tx_hash = "0xabc";
        crate::log_event!(info, "test", "plain event");
        crate::log_event!(warn, "test", "with fields", attempt = 2);
        crate::log_market_event!(info, "test", "market event", 7u64, outcome = true);
        crate::log_tx_event!(debug, "test", "tx event", tx_hash);
    }
}
