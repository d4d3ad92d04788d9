//! バックエンドアダプタ
//!
//! 3 種類のバックエンドの送受信形式の違いをここで吸収し、
//! 「入力を 1 回送って応答テキストを受け取る」という共通の契約にそろえる。

pub mod azure_openai;
pub mod backend;
pub mod factory;
pub mod kaito_llama;
pub mod kaito_phi3;

pub use azure_openai::AzureOpenAiBackend;
pub use backend::{BackendInput, ChatBackend};
pub use factory::{create_backend, AnyBackend, BackendDeps, BackendFactory, StdBackendFactory};
pub use kaito_llama::KaitoLlamaBackend;
pub use kaito_phi3::KaitoPhi3Backend;
