use std::{env, fs, path::PathBuf};

use db::models::{
    ai_history::{AiHistoryItem, HistoryKind},
    user_profile::{UserProfile, UserRole},
};
use server::routes::{
    ai::{AuditRequest, FormulaRequest, IdeasRequest},
    appearance::AppearanceView,
    auth::LoginRequest,
    info::ServerInfo,
    sheets::AnalyzeSheetRequest,
};
use services::services::{
    admin::UsageStats,
    appearance::{
        AppearancePatch, AppearanceSettings, BackgroundType, BannerStyle, FontFamily,
        PresentationVars, TableStyle, ThemeColor,
    },
    assistant::AssistantReply,
    sheets::{AnalysisStage, SheetAnalysis, SpreadsheetMetadata},
};
use ts_rs::TS;

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate_types`.\n// Do not edit it by hand.\n";
    let decls = [
        UserRole::decl(),
        UserProfile::decl(),
        HistoryKind::decl(),
        AiHistoryItem::decl(),
        AssistantReply::decl(),
        UsageStats::decl(),
        BannerStyle::decl(),
        BackgroundType::decl(),
        FontFamily::decl(),
        ThemeColor::decl(),
        TableStyle::decl(),
        AppearanceSettings::decl(),
        AppearancePatch::decl(),
        PresentationVars::decl(),
        AppearanceView::decl(),
        SpreadsheetMetadata::decl(),
        SheetAnalysis::decl(),
        AnalysisStage::decl(),
        ServerInfo::decl(),
        LoginRequest::decl(),
        FormulaRequest::decl(),
        AuditRequest::decl(),
        IdeasRequest::decl(),
        AnalyzeSheetRequest::decl(),
        "type ApiResponse<T> = { success: boolean, data: T | null, message: string | null };"
            .to_string(),
    ];

    let body = decls
        .iter()
        .map(|d| format!("export {}", d.trim_start_matches("export ")))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{header}\n{body}\n")
}

fn main() -> std::io::Result<()> {
    let out: PathBuf = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shared/types.ts"));

    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out, generate_types_content())?;
    println!("Wrote {}", out.display());
    Ok(())
}
