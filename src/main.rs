// toaster - 命令行访问通知日志数据
//
// 用法：
//   toaster query <uri> [sort]
//   toaster insert <uri> <json>
//   toaster update <uri> <json> [selection] [args...]
//   toaster delete <uri> [selection] [args...]
//   toaster type <uri>
//   toaster packages <dir>

use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;
use toaster_provider::{
    init_global_logger, ContentUri, ContentValues, ManifestResolver, PackageCatalog,
    ProviderConfig, ToasterProvider,
};

const USAGE: &str = "用法: toaster <query|insert|update|delete|type|packages> <uri|dir> [参数...]";

fn main() -> Result<()> {
    let config = match env::var("TOASTER_CONFIG") {
        Ok(path) => ProviderConfig::load(Path::new(&path)),
        Err(_) => ProviderConfig::load_default(),
    }
    .context("加载配置失败")?;

    init_global_logger(config.logging.clone())?;

    let args: Vec<String> = env::args().skip(1).collect();
    let (command, target, rest) = match args.as_slice() {
        [command, target, rest @ ..] => (command.as_str(), target.as_str(), rest),
        _ => bail!(USAGE),
    };

    if command == "packages" {
        return list_packages(Path::new(target));
    }

    let (provider, mut refreshes) = ToasterProvider::from_config(&config);
    let uri = ContentUri::parse(target)?;

    match command {
        "query" => {
            let sort = rest.first().map(String::as_str);
            let cursor = provider.query(&uri, None, None, &[], sort)?;
            for row in &cursor {
                println!("{}", serde_json::to_string(row)?);
            }
        }
        "insert" => {
            let values = parse_values(rest.first())?;
            println!("{}", provider.insert(&uri, &values)?);
        }
        "update" => {
            let values = parse_values(rest.first())?;
            let (selection, selection_args) = split_selection(rest.get(1..).unwrap_or_default());
            println!("{}", provider.update(&uri, &values, selection, &selection_args)?);
        }
        "delete" => {
            let (selection, selection_args) = split_selection(rest);
            println!("{}", provider.delete(&uri, selection, &selection_args)?);
        }
        "type" => println!("{}", provider.get_type(&uri)?),
        _ => bail!(USAGE),
    }

    while let Ok(action) = refreshes.try_recv() {
        tracing::info!(action = %action, "显示刷新事件");
    }
    Ok(())
}

fn parse_values(raw: Option<&String>) -> Result<ContentValues> {
    let raw = raw.context("缺少 JSON 格式的写入值")?;
    serde_json::from_str(raw).with_context(|| format!("写入值不是 JSON 对象: {raw}"))
}

fn split_selection(rest: &[String]) -> (Option<&str>, Vec<&str>) {
    match rest {
        [selection, args @ ..] => (
            Some(selection.as_str()),
            args.iter().map(String::as_str).collect(),
        ),
        [] => (None, Vec::new()),
    }
}

fn list_packages(dir: &Path) -> Result<()> {
    let catalog = PackageCatalog::scan_dir(dir)?;
    for (entry, label) in catalog.sorted_by_label(&ManifestResolver) {
        let icon = if entry.icon(&ManifestResolver).is_default() {
            "default"
        } else {
            "custom"
        };
        println!(
            "{}\t{}\t{:?}\t{}",
            entry.package_name(),
            label,
            entry.mount_state(),
            icon
        );
    }
    Ok(())
}
