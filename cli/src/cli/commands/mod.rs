use std::collections::HashMap;
use std::fs;
use std::process;

use anyhow::{Context as _, Result, anyhow, bail};
use stellar_empires_core::{
    GameSnapshot, GameState, RandomEventKind, SpyMission, TechId, TreatyStatus,
};

use super::{
    parse_domain, parse_number, print_empire_details, print_help, print_overview, print_reports,
    print_research, print_status_line, resolve_empire,
};

pub struct Context<'a> {
    game: &'a mut GameState,
}

impl<'a> Context<'a> {
    pub fn new(game: &'a mut GameState) -> Self {
        Self { game }
    }

    pub fn game(&self) -> &GameState {
        &*self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut *self.game
    }
}

pub struct Args<'a> {
    tokens: Vec<&'a str>,
    index: usize,
}

impl<'a> Args<'a> {
    pub fn new(tokens: Vec<&'a str>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn next(&mut self) -> Option<&'a str> {
        if self.index >= self.tokens.len() {
            return None;
        }
        let value = self.tokens[self.index];
        self.index += 1;
        Some(value)
    }

    pub fn next_required(&mut self, message: &str) -> Result<&'a str> {
        self.next().ok_or_else(|| anyhow!(message.to_owned()))
    }
}

pub trait Command {
    fn name() -> &'static str;
    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()>;
}

type CommandFn = for<'a> fn(&mut Context<'a>, Args<'a>) -> Result<()>;

pub struct CommandRegistry {
    handlers: HashMap<&'static str, CommandFn>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<C: Command>(&mut self) {
        let name = C::name();
        if self.handlers.insert(name, C::execute).is_some() {
            panic!("重複したコマンド登録です: {name}");
        }
    }

    pub fn dispatch<'a>(&self, command: &str, ctx: &mut Context<'a>, args: Args<'a>) -> Result<()> {
        if let Some(handler) = self.handlers.get(command) {
            handler(ctx, args)
        } else {
            bail!("未対応のコマンドです: {command}. help で一覧を確認してください。");
        }
    }

    pub fn execute_input<'a>(&self, ctx: &mut Context<'a>, input: &'a str) -> Result<()> {
        let mut parts = input.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(anyhow!("コマンドが指定されていません。"));
        };
        let command_name = head.to_ascii_lowercase();
        let args = Args::new(parts.collect());
        self.dispatch(command_name.as_str(), ctx, args)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register::<HelpCommand>();
        registry.register::<HelpAliasCommand>();
        registry.register::<OverviewCommand>();
        registry.register::<OverviewAliasCommand>();
        registry.register::<InspectCommand>();
        registry.register::<ResearchCommand>();
        registry.register::<AllocCommand>();
        registry.register::<LockCommand>();
        registry.register::<UnlockCommand>();
        registry.register::<TargetCommand>();
        registry.register::<SpiesCommand>();
        registry.register::<SecurityCommand>();
        registry.register::<TreatyCommand>();
        registry.register::<EventsCommand>();
        registry.register::<TriggerCommand>();
        registry.register::<EndCommand>();
        registry.register::<SaveCommand>();
        registry.register::<LoadCommand>();
        registry.register::<QuitCommand>();
        registry.register::<ExitCommand>();
        registry
    }
}

pub struct HelpCommand;

impl Command for HelpCommand {
    fn name() -> &'static str {
        "help"
    }

    fn execute(_ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_help();
        Ok(())
    }
}

pub struct HelpAliasCommand;

impl Command for HelpAliasCommand {
    fn name() -> &'static str {
        "?"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        HelpCommand::execute(ctx, args)
    }
}

pub struct OverviewCommand;

impl Command for OverviewCommand {
    fn name() -> &'static str {
        "overview"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_overview(ctx.game());
        Ok(())
    }
}

pub struct OverviewAliasCommand;

impl Command for OverviewAliasCommand {
    fn name() -> &'static str {
        "ov"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        OverviewCommand::execute(ctx, args)
    }
}

pub struct InspectCommand;

impl Command for InspectCommand {
    fn name() -> &'static str {
        "inspect"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let token = args.next_required("対象の帝国を指定してください。")?;
        let id = resolve_empire(ctx.game(), token)?;
        print_empire_details(ctx.game(), id);
        Ok(())
    }
}

pub struct ResearchCommand;

impl Command for ResearchCommand {
    fn name() -> &'static str {
        "research"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let id = match args.next() {
            Some(token) => resolve_empire(ctx.game(), token)?,
            None => ctx.game().player(),
        };
        print_research(ctx.game(), id);
        Ok(())
    }
}

pub struct AllocCommand;

impl Command for AllocCommand {
    fn name() -> &'static str {
        "alloc"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let id = resolve_empire(ctx.game(), args.next_required("帝国を指定してください。")?)?;
        let domain = parse_domain(args.next_required("研究分野を指定してください。")?)?;
        let ticks: i32 = parse_number(args.next_required("配分値を指定してください。")?, "配分値")?;
        let applied = ctx.game_mut().set_allocation(id, domain, ticks)?;
        println!(
            "{} の {} 配分を {} に設定しました。",
            ctx.game().empires()[id.0].name,
            domain.label(),
            applied
        );
        Ok(())
    }
}

pub struct LockCommand;

impl Command for LockCommand {
    fn name() -> &'static str {
        "lock"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        toggle_lock(ctx, args, true)
    }
}

pub struct UnlockCommand;

impl Command for UnlockCommand {
    fn name() -> &'static str {
        "unlock"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        toggle_lock(ctx, args, false)
    }
}

fn toggle_lock(ctx: &mut Context<'_>, mut args: Args<'_>, locked: bool) -> Result<()> {
    let id = resolve_empire(ctx.game(), args.next_required("帝国を指定してください。")?)?;
    let domain = parse_domain(args.next_required("研究分野を指定してください。")?)?;
    ctx.game_mut().set_allocation_locked(id, domain, locked)?;
    let verb = if locked { "固定しました" } else { "固定を解除しました" };
    println!(
        "{} の {} 配分を{}。",
        ctx.game().empires()[id.0].name,
        domain.label(),
        verb
    );
    Ok(())
}

pub struct TargetCommand;

impl Command for TargetCommand {
    fn name() -> &'static str {
        "target"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let id = resolve_empire(ctx.game(), args.next_required("帝国を指定してください。")?)?;
        let domain = parse_domain(args.next_required("研究分野を指定してください。")?)?;
        let tech = TechId::new(args.next_required("技術 ID を指定してください。")?);
        ctx.game_mut().set_research_target(id, domain, &tech)?;
        let name = ctx
            .game()
            .catalog()
            .get(&tech)
            .map(|tech| tech.name.clone())
            .unwrap_or_else(|| tech.to_string());
        println!(
            "{} の {} 研究目標を {} に変更しました。",
            ctx.game().empires()[id.0].name,
            domain.label(),
            name
        );
        Ok(())
    }
}

pub struct SpiesCommand;

impl Command for SpiesCommand {
    fn name() -> &'static str {
        "spies"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let owner = resolve_empire(ctx.game(), args.next_required("帝国を指定してください。")?)?;
        let target = resolve_empire(ctx.game(), args.next_required("相手の帝国を指定してください。")?)?;
        if let Some(token) = args.next() {
            let mission = SpyMission::from_token(token).ok_or_else(|| {
                anyhow!("未知の任務です: {} (hide | sabotage | espionage)", token)
            })?;
            ctx.game_mut().set_spy_mission(owner, target, mission)?;
        }
        if let Some(token) = args.next() {
            let ticks: i32 = parse_number(token, "諜報配分")?;
            ctx.game_mut().set_spy_allocation(owner, target, ticks)?;
        }

        let game = ctx.game();
        let owner_state = game.empire(owner)?;
        let view = owner_state
            .view(target)
            .ok_or_else(|| anyhow!("{} は自国に諜報網を持てません。", owner_state.name))?;
        let spies = &view.spies;
        println!(
            "{} → {}: 任務 {} / 配分 {} / 諜報員 {} 名 / 積立 {:.1} BC",
            owner_state.name,
            game.empires()[target.0].name,
            spies.mission.label(),
            spies.allocation,
            spies.active_spies,
            spies.spy_bc
        );
        println!(
            "  窃取可能な技術 {} 件 (軍事 {} 件) / 工作目標 基地 {} ・工場 {} ・反乱 {}",
            spies.stealable_techs.len(),
            spies.war_techs.len(),
            spies.base_targets.len(),
            spies.factory_targets.len(),
            spies.rebellion_targets.len()
        );
        Ok(())
    }
}

pub struct SecurityCommand;

impl Command for SecurityCommand {
    fn name() -> &'static str {
        "security"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let id = resolve_empire(ctx.game(), args.next_required("帝国を指定してください。")?)?;
        let level: i32 = parse_number(args.next_required("保安レベルを指定してください。")?, "保安レベル")?;
        let applied = ctx.game_mut().set_internal_security(id, level)?;
        println!(
            "{} の国内保安レベルを {} に設定しました。",
            ctx.game().empires()[id.0].name,
            applied
        );
        Ok(())
    }
}

pub struct TreatyCommand;

impl Command for TreatyCommand {
    fn name() -> &'static str {
        "treaty"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let a = resolve_empire(ctx.game(), args.next_required("帝国を指定してください。")?)?;
        let b = resolve_empire(ctx.game(), args.next_required("相手の帝国を指定してください。")?)?;
        let token = args.next_required("条約の種類を指定してください。")?;
        let status = TreatyStatus::from_token(token).ok_or_else(|| {
            anyhow!(
                "未知の条約です: {} (none | pact | alliance | war | unity)",
                token
            )
        })?;
        let changed = ctx.game_mut().set_treaty(a, b, status)?;
        let game = ctx.game();
        if changed {
            println!(
                "{} と {} の関係を {} に変更しました。",
                game.empires()[a.0].name,
                game.empires()[b.0].name,
                status.label()
            );
        } else {
            println!("条約は既に {} です。", status.label());
        }
        Ok(())
    }
}

pub struct EventsCommand;

impl Command for EventsCommand {
    fn name() -> &'static str {
        "events"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        let game = ctx.game();
        print_status_line(&game.turn_status());
        let events = game.random_events();
        let active = events
            .active()
            .iter()
            .map(|kind| kind.label())
            .collect::<Vec<_>>();
        println!(
            "進行中のイベント: {}",
            if active.is_empty() {
                "なし".to_string()
            } else {
                active.join(", ")
            }
        );
        if let Some(pirates) = game.pirates() {
            if let Some(system) = pirates.target_system().and_then(|id| game.galaxy().system(id)) {
                println!(
                    "宇宙海賊: {} へ接近中 (到着まで {} ターン / 船体 {:.0}/{:.0})",
                    system.name,
                    pirates.countdown(),
                    pirates.fleet().hull,
                    pirates.fleet().max_hull
                );
            }
        }
        println!("最近の通知:");
        for notice in game.notices().iter().rev().take(5) {
            println!("  [ターン{}] {}", notice.turn, notice.message);
        }
        Ok(())
    }
}

pub struct TriggerCommand;

impl Command for TriggerCommand {
    fn name() -> &'static str {
        "trigger"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let token = args.next_required("イベントの種類を指定してください。")?;
        let kind = RandomEventKind::from_token(token).ok_or_else(|| {
            anyhow!(
                "未知のイベントです: {} (donation | relic | plague | accident | pirates)",
                token
            )
        })?;
        let target = match args.next() {
            Some(token) => resolve_empire(ctx.game(), token)?,
            None => ctx.game().player(),
        };
        let messages = ctx.game_mut().force_event(kind, target)?;
        print_reports(ctx.game().turn(), &messages);
        Ok(())
    }
}

pub struct EndCommand;

impl Command for EndCommand {
    fn name() -> &'static str {
        "end"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let turns: u32 = match args.next() {
            Some(token) => parse_number(token, "ターン数")?,
            None => 1,
        };
        if turns == 0 {
            bail!("ターン数は1以上で指定してください。");
        }
        let reports = ctx.game_mut().advance_turns(turns);
        print_reports(ctx.game().turn(), &reports);
        Ok(())
    }
}

pub struct SaveCommand;

impl Command for SaveCommand {
    fn name() -> &'static str {
        "save"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let path = args.next_required("保存先のファイルを指定してください。")?;
        let json = ctx.game_mut().snapshot().to_json()?;
        fs::write(path, json).with_context(|| format!("ファイルに書き込めません: {path}"))?;
        println!("ターン{} を {} に保存しました。", ctx.game().turn(), path);
        Ok(())
    }
}

pub struct LoadCommand;

impl Command for LoadCommand {
    fn name() -> &'static str {
        "load"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let path = args.next_required("読み込むファイルを指定してください。")?;
        let content =
            fs::read_to_string(path).with_context(|| format!("ファイルを開けません: {path}"))?;
        let snapshot = GameSnapshot::from_json(&content)?;
        *ctx.game_mut() = GameState::restore(snapshot)?;
        println!("{} からターン{} を読み込みました。", path, ctx.game().turn());
        Ok(())
    }
}

pub struct QuitCommand;

impl Command for QuitCommand {
    fn name() -> &'static str {
        "quit"
    }

    fn execute(_ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        println!("ゲームを終了します。");
        process::exit(0);
    }
}

pub struct ExitCommand;

impl Command for ExitCommand {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        QuitCommand::execute(ctx, args)
    }
}
