/// DynamoDB接続設定
use aws_sdk_dynamodb::Client as DynamoDbClient;
use thiserror::Error;

/// DynamoDB設定のエラー型
#[derive(Debug, Error)]
pub enum DynamoDbConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// テーブル名とクライアントを持つDynamoDB設定
///
/// この構造体は環境変数から読み込んだDynamoDBクライアントとテーブル名を保持します。
/// テーブル名は以下の環境変数で設定:
/// - INSTRUCTORS_TABLE: 講師レコード用テーブル
/// - ADMIN_EMAILS_TABLE: 管理者メール用テーブル
#[derive(Debug, Clone)]
pub struct DynamoDbConfig {
    /// DynamoDBクライアントインスタンス
    client: DynamoDbClient,
    /// 講師テーブル名
    instructors_table: String,
    /// 管理者メールテーブル名
    admin_emails_table: String,
}

impl DynamoDbConfig {
    /// 環境からAWS設定を読み込み、環境変数からテーブル名を読み取って新しいDynamoDbConfigを作成
    ///
    /// 環境変数:
    /// - AWS認証情報: aws-configにより自動読み込み
    /// - INSTRUCTORS_TABLE: 講師レコード用DynamoDBテーブル名
    /// - ADMIN_EMAILS_TABLE: 管理者メール用DynamoDBテーブル名
    pub async fn from_env() -> Result<Self, DynamoDbConfigError> {
        // 環境からAWS設定を読み込み（認証情報、リージョンなど）
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let client = DynamoDbClient::new(&aws_config);

        let instructors_table = std::env::var("INSTRUCTORS_TABLE")
            .map_err(|_| DynamoDbConfigError::MissingEnvVar("INSTRUCTORS_TABLE".to_string()))?;

        let admin_emails_table = std::env::var("ADMIN_EMAILS_TABLE")
            .map_err(|_| DynamoDbConfigError::MissingEnvVar("ADMIN_EMAILS_TABLE".to_string()))?;

        Ok(Self {
            client,
            instructors_table,
            admin_emails_table,
        })
    }

    /// 明示的な値で新しいDynamoDbConfigを作成（テスト用）
    pub fn new(
        client: DynamoDbClient,
        instructors_table: String,
        admin_emails_table: String,
    ) -> Self {
        Self {
            client,
            instructors_table,
            admin_emails_table,
        }
    }

    /// DynamoDBクライアントへの参照を取得
    pub fn client(&self) -> &DynamoDbClient {
        &self.client
    }

    /// 講師テーブル名を取得
    pub fn instructors_table(&self) -> &str {
        &self.instructors_table
    }

    /// 管理者メールテーブル名を取得
    pub fn admin_emails_table(&self) -> &str {
        &self.admin_emails_table
    }
}
