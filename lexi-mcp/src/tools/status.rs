use crate::config::ServerConfig;
use lexi_retriever::status::IndexStatus;
use lexi_retriever::storage::artifact_store::ArtifactStore;
use std::fmt::Write;

/// Index health followed by the settings requests run with.
pub async fn status(config: &ServerConfig) -> String {
    let store = ArtifactStore::new(config.resolved_index_dir());
    let index = IndexStatus::collect_async(store).await;

    let mut out = format!(
        "Lexi MCP Server Status\n\
        ======================\n\
        Server Version: {}\n\
        Root Directory: {}\n\n",
        env!("CARGO_PKG_VERSION"),
        config.root_dir.display()
    );

    out.push_str("Index\n-----\n");
    out.push_str(&index.summary());

    let _ = write!(
        out,
        "\nAnswering\n---------\n\
        Embedding Model: {}\n\
        Top K: {}\n\
        Context Limit: {} chars\n\
        Generator: {}\n\
        Generation Timeout: {}s\n",
        config.embed.model_name,
        config.top_k,
        config.context_limit,
        config.generator_command.join(" "),
        config.generation_timeout_secs
    );

    if !index.is_healthy() {
        out.push_str(
            "\nTroubleshooting\n---------------\n\
            Questions will be rejected until the index is rebuilt:\n\
            lexi-retriever --index-dir <index_dir> index --docs <documents>\n",
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_status_without_index() {
        let root = tempdir().unwrap();
        let config = ServerConfig::new(root.path().to_path_buf());

        let out = status(&config).await;
        assert!(out.contains("no index built yet"));
        assert!(out.contains("Top K: 3"));
        assert!(out.contains("Generator: ollama run mistral:7b-instruct"));
        assert!(out.contains("Troubleshooting"));
    }
}
