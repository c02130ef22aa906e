pub mod catalog;
pub mod jobs;
pub mod object_store;
pub mod warehouse;

pub use catalog::CatalogGateway;
pub use jobs::JobGateway;
pub use object_store::ObjectStoreGateway;
pub use warehouse::WarehouseGateway;

use crate::utils::error::EtlError;

/// 記錄錯誤代碼與訊息後交由呼叫端處理
pub(crate) fn log_failure(err: &EtlError) {
    match err {
        EtlError::ProviderError {
            service,
            operation,
            code,
            message,
            ..
        } => tracing::error!(
            service = %service,
            operation = %operation,
            code = %code,
            "❌ {}",
            message
        ),
        other => tracing::error!("❌ {}", other),
    }
}
