// OpenSearchクライアント
//
// AWS SigV4認証を使用してOpenSearch Serviceに接続するクライアント。
// 実行環境のIAMロールを使用して自動的に認証する。

use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::OpenSearch;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use super::config::SearchConfig;

/// 検索クライアントエラー
#[derive(Debug, Error)]
pub enum SearchClientError {
    /// エンドポイントURLのパースに失敗
    #[error("エンドポイントURLのパースに失敗: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// トランスポート構築に失敗
    #[error("トランスポート構築に失敗: {0}")]
    TransportBuildError(String),

    /// AWS認証エラー
    #[error("AWS認証エラー: {0}")]
    AwsAuthError(String),
}

/// 検索クライアント
///
/// AWS SigV4認証を使用してOpenSearch Serviceに接続するクライアント。
/// コネクションプーリングを活用して接続を再利用する。
#[derive(Debug, Clone)]
pub struct SearchClient {
    /// OpenSearchクライアントインスタンス
    client: OpenSearch,
    /// インデックス名
    index_name: String,
}

impl SearchClient {
    /// 設定から検索クライアントを作成
    ///
    /// aws-configからAWS認証情報を自動的に取得する。
    pub async fn new(config: &SearchConfig) -> Result<Self, SearchClientError> {
        info!(
            endpoint = config.endpoint(),
            index_name = config.index_name(),
            "検索クライアントを初期化中"
        );

        let url = Url::parse(config.endpoint())?;

        let conn_pool = SingleNodeConnectionPool::new(url);

        // AWS設定を読み込み（実行環境のIAMロールから自動取得）
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        // AWS SigV4認証付きトランスポートを構築
        let transport = TransportBuilder::new(conn_pool)
            .auth(
                aws_config
                    .clone()
                    .try_into()
                    .map_err(|e| SearchClientError::AwsAuthError(format!("{:?}", e)))?,
            )
            .service_name("es")
            .build()
            .map_err(|e| {
                error!(error = %e, "検索トランスポート構築に失敗");
                SearchClientError::TransportBuildError(e.to_string())
            })?;

        let client = OpenSearch::new(transport);

        info!(
            endpoint = config.endpoint(),
            index_name = config.index_name(),
            "検索クライアントの初期化が完了"
        );

        Ok(Self {
            client,
            index_name: config.index_name().to_string(),
        })
    }

    /// 内部OpenSearchクライアントへの参照を取得
    pub fn client(&self) -> &OpenSearch {
        &self.client
    }

    /// インデックス名を取得
    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}
