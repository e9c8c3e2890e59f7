use crate::error::FileError;
use crate::models::blueprint::Blueprint;
use crate::models::question::QuestionRecord;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 题库文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolFormat {
    Json,
    JsonLines,
    Toml,
}

impl PoolFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Some(Self::Json),
            Some("jsonl") => Some(Self::JsonLines),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

/// `{ "questions": [...] }` 形式的题库文件
#[derive(Deserialize)]
struct QuestionsWrapper {
    questions: Vec<QuestionRecord>,
}

/// JSON 题库既可以是数组，也可以是带 `questions` 字段的对象
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonPool {
    List(Vec<QuestionRecord>),
    Wrapped(QuestionsWrapper),
}

async fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(FileError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取文件: {}", path.display()))
}

/// 从 JSON / JSONL / TOML 文件加载题库
pub async fn load_pool(path: &Path) -> Result<Vec<QuestionRecord>> {
    let path_str = path.display().to_string();
    let format = PoolFormat::from_path(path).ok_or_else(|| FileError::UnsupportedFormat {
        path: path_str.clone(),
    })?;
    let content = read_text(path).await?;

    let records = match format {
        PoolFormat::Json => {
            let pool: JsonPool =
                serde_json::from_str(&content).map_err(|source| FileError::JsonParseFailed {
                    path: path_str.clone(),
                    source,
                })?;
            match pool {
                JsonPool::List(records) => records,
                JsonPool::Wrapped(wrapper) => wrapper.questions,
            }
        }
        PoolFormat::JsonLines => {
            let mut records = Vec::new();
            for (line_no, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record: QuestionRecord = serde_json::from_str(line)
                    .map_err(|source| FileError::JsonParseFailed {
                        path: path_str.clone(),
                        source,
                    })
                    .with_context(|| format!("第 {} 行解析失败", line_no + 1))?;
                records.push(record);
            }
            records
        }
        PoolFormat::Toml => {
            let wrapper: QuestionsWrapper =
                toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
                    path: path_str.clone(),
                    source,
                })?;
            wrapper.questions
        }
    };

    tracing::debug!("从 {} 加载了 {} 道题目", path_str, records.len());
    Ok(records)
}

/// 从 JSON / TOML 文件加载蓝图
pub async fn load_blueprint(path: &Path) -> Result<Blueprint> {
    let path_str = path.display().to_string();
    let content = read_text(path).await?;

    let blueprint: Blueprint = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|source| {
            FileError::JsonParseFailed {
                path: path_str.clone(),
                source,
            }
        })?,
        Some("toml") => toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: path_str.clone(),
            source,
        })?,
        _ => return Err(FileError::UnsupportedFormat { path: path_str }.into()),
    };

    Ok(blueprint)
}

/// 从文件夹中加载所有题库文件（试卷 / 题库产物），按文件名排序
///
/// 单个文件加载失败只记录警告，不影响其他文件。
pub async fn load_pools_in_folder(folder_path: &Path) -> Result<Vec<(String, Vec<QuestionRecord>)>> {
    if !folder_path.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path.display());
    }

    let mut files: Vec<PathBuf> = Vec::new();
    let mut entries = fs::read_dir(folder_path)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if PoolFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();

    let mut artifacts = Vec::new();
    for path in files {
        let name = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        tracing::info!("正在加载: {}", name);

        match load_pool(&path).await {
            Ok(records) => {
                tracing::info!("成功加载 {} 道题目", records.len());
                artifacts.push((name, records));
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_every_pool_format() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("a.json");
        std::fs::write(
            &json,
            r#"{"questions": [{"id": "B-A-B-C-001-001", "type": "B", "knowledge_point_l3": "A-B-C"}]}"#,
        )
        .unwrap();
        let jsonl = dir.path().join("b.jsonl");
        std::fs::write(
            &jsonl,
            "{\"id\": \"x1\", \"type_code\": \"C\", \"leaf_knowledge_code\": \"A-B-C\"}\n\n{\"id\": \"x2\"}\n",
        )
        .unwrap();
        let toml_path = dir.path().join("c.toml");
        std::fs::write(
            &toml_path,
            "[[questions]]\nid = \"t1\"\ntype_code = \"single_choice\"\nleaf_knowledge_code = \"A-B-C\"\n",
        )
        .unwrap();

        assert_eq!(load_pool(&json).await.unwrap().len(), 1);
        let lines = load_pool(&jsonl).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].type_code.is_none());
        assert_eq!(load_pool(&toml_path).await.unwrap()[0].id, "t1");

        let all = load_pools_in_folder(dir.path()).await.unwrap();
        let names: Vec<_> = all.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn rejects_unknown_extension_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("pool.csv");
        std::fs::write(&csv, "id\n").unwrap();
        let err = load_pool(&csv).await.unwrap_err();
        assert!(err.to_string().contains("不支持的文件格式"));

        let missing = dir.path().join("missing.json");
        let err = load_pool(&missing).await.unwrap_err();
        assert!(err.to_string().contains("文件不存在"));
    }

    #[tokio::test]
    async fn loads_blueprint_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bp.json");
        std::fs::write(
            &path,
            r#"{"name": "bp", "nodes": [{"code": "C", "children": [{"code": "A", "children": [{"code": "A", "quotas": {"B": 5}}]}]}]}"#,
        )
        .unwrap();
        let blueprint = load_blueprint(&path).await.unwrap();
        assert_eq!(blueprint.name, "bp");
        assert_eq!(blueprint.nodes[0].code, "C");
    }
}
