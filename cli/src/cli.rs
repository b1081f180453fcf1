mod commands;

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result, anyhow};
use stellar_empires_core::{EmpireId, GameState, TechDomain, TurnStatus};

use commands::{CommandRegistry, Context};

pub fn run(game: &mut GameState) -> Result<()> {
    print_intro(game);
    let registry = CommandRegistry::default();
    let stdin = io::stdin();

    loop {
        print!("ターン{}> ", game.turn());
        io::stdout()
            .flush()
            .context("プロンプトのフラッシュに失敗しました")?;

        let mut line = String::new();
        let bytes = stdin
            .lock()
            .read_line(&mut line)
            .context("入力の読み込みに失敗しました")?;

        if bytes == 0 {
            println!("入力が終了したためゲームを終了します。");
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut ctx = Context::new(game);
        if let Err(error) = registry.execute_input(&mut ctx, trimmed) {
            println!("エラー: {error}");
        }
    }
}

fn print_intro(game: &GameState) {
    let player = &game.empires()[game.player().0];
    println!("銀河帝国シミュレーターへようこそ。");
    println!(
        "あなたは {} ({}) を率います。{} の帝国が銀河に存在します。",
        player.name,
        player.race,
        game.empires().len()
    );
    println!("コマンド例: overview / research 1 / alloc 1 weapon 12 / spies 1 2 / end 5");
    println!("help で利用可能なコマンド一覧を表示します。");
}

pub(crate) fn print_help() {
    println!("利用可能なコマンド:");
    println!("  overview                      各帝国の概要を表示");
    println!("  inspect <帝国>                帝国の詳細と外交関係を表示");
    println!("  research <帝国>               研究分野ごとの状況を表示");
    println!("  alloc <帝国> <分野> <値>      研究配分を設定 (0〜60)");
    println!("  lock <帝国> <分野>            研究配分を固定");
    println!("  unlock <帝国> <分野>          研究配分の固定を解除");
    println!("  target <帝国> <分野> <技術>   研究目標を変更");
    println!("  spies <帝国> <相手> [任務] [配分]  諜報網を表示・設定");
    println!("                                任務: hide | sabotage | espionage");
    println!("  security <帝国> <値>          国内保安レベルを設定");
    println!("  treaty <帝国> <相手> <状態>   条約を設定 (none | pact | alliance | war | unity)");
    println!("  events                        ランダムイベントの状況を表示");
    println!("  trigger <イベント> <帝国>     イベントを強制発生");
    println!("  end [ターン数]                ターンを進める");
    println!("  save <ファイル>               ゲームを保存");
    println!("  load <ファイル>               保存したゲームを読み込む");
    println!("  quit                          ゲームを終了");
}

pub(crate) fn print_overview(game: &GameState) {
    let status = game.turn_status();
    print_status_line(&status);
    println!(
        "ID | {:<14} | {:<10} | {:>8} | {:>6} | {:>4} | {:<10}",
        "帝国", "指導者", "生産", "技術数", "保安", "状態"
    );
    let galaxy = game.galaxy();
    for (idx, empire) in game.empires().iter().enumerate() {
        let state = if empire.extinct {
            "滅亡"
        } else if empire.is_player {
            "プレイヤー"
        } else {
            "AI"
        };
        println!(
            "{:>2} | {:<14} | {:<10} | {:>8.1} | {:>6} | {:>4} | {:<10}",
            idx + 1,
            empire.name,
            empire.leader.personality.label(),
            empire.total_production(galaxy),
            empire.tech.known_count(),
            empire.internal_security(),
            state
        );
    }
}

pub(crate) fn print_status_line(status: &TurnStatus) {
    let next = status
        .next_task_turn
        .map(|turn| turn.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "ターン {} (宇宙暦 {}) / 次の処理: ターン {} / イベント発生率 {:.1}%",
        status.turn,
        status.star_date.year,
        next,
        status.event_chance * 100.0
    );
}

pub(crate) fn print_empire_details(game: &GameState, id: EmpireId) {
    let empire = &game.empires()[id.0];
    let galaxy = game.galaxy();
    println!("-- {} の状況 --", empire.name);
    println!("種族: {}", empire.race);
    println!(
        "指導者: {} / {}",
        empire.leader.personality.label(),
        empire.leader.objective.label()
    );
    println!("生産力: {:.1}", empire.total_production(galaxy));
    println!("研究力: {:.1}", empire.total_research_points(galaxy));
    println!("備蓄: {:.1} BC", empire.reserve);
    println!("国内保安レベル: {}", empire.internal_security());
    println!("植民地:");
    for system in galaxy.colonies_of(id) {
        if let Some(colony) = &system.colony {
            let rebellion = if colony.rebellion { " (反乱中)" } else { "" };
            println!(
                "  - {:<12} 人口 {:>6.1} 工場 {:>6.1} ミサイル基地 {:>3}{}",
                system.name, colony.population, colony.factories, colony.missile_bases, rebellion
            );
        }
    }

    println!("外交関係:");
    for view in empire.views.values() {
        let other = &game.empires()[view.target.0];
        if !view.embassy.contact {
            println!("  - {:<14}: 未接触", other.name);
            continue;
        }
        println!(
            "  - {:<14}: {:<8} 関係 {:>4} / 事件 {} 件 / 諜報員 {} 名",
            other.name,
            view.embassy.status.label(),
            view.embassy.relations,
            view.embassy.incidents.len(),
            view.spies.active_spies
        );
    }
}

pub(crate) fn print_research(game: &GameState, id: EmpireId) {
    let empire = &game.empires()[id.0];
    let catalog = game.catalog();
    println!("-- {} の研究状況 --", empire.name);
    for category in empire.tech.categories() {
        let current = category
            .current_tech()
            .and_then(|tech| catalog.get(tech))
            .map(|tech| format!("{} (Lv{})", tech.name, tech.level))
            .unwrap_or_else(|| "なし".to_string());
        let lock = if category.is_locked() { " [固定]" } else { "" };
        println!(
            "{:<8} 配分 {:>2} ({:>5.1}%){} / 蓄積 {:>8.1} BC / 既知 {:>2} / 研究中: {}",
            category.domain().label(),
            category.allocation(),
            category.allocation_pct() * 100.0,
            lock,
            category.total_bc(),
            category.known_techs().len(),
            current
        );
    }
}

pub(crate) fn resolve_empire(game: &GameState, token: &str) -> Result<EmpireId> {
    game.find_empire_index(token).ok_or_else(|| {
        anyhow!(
            "帝国を特定できませんでした: {} (番号か帝国名を入力してください)",
            token
        )
    })
}

pub(crate) fn parse_domain(token: &str) -> Result<TechDomain> {
    TechDomain::from_token(token).ok_or_else(|| {
        anyhow!(
            "未知の研究分野です: {} (computer | construction | force_field | planetology | propulsion | weapon)",
            token
        )
    })
}

pub(crate) fn parse_number<T: std::str::FromStr>(token: &str, label: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| anyhow!("{}は数値で指定してください: {}", label, token))
}

pub(crate) fn print_reports(turn: u32, reports: &[String]) {
    println!("--- ターン{} までの結果 ---", turn);
    if reports.is_empty() {
        println!("- 特筆すべき出来事はありません。");
    }
    for report in reports {
        println!("- {report}");
    }
    println!("--------------------------");
}
