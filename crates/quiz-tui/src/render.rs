use crate::app::{App, LoginField, LoginMode, SaveState, ScreenState, SettingsRow};
use crossterm::{
    cursor::{Hide, MoveTo},
    execute,
    style::{Color, Print, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use quiz_core::{Difficulty, SessionPhase, TimeBand, UserStatistics, DURATION_CHOICES};
use std::io;

/// Seconds left at which the countdown bar turns to the warning color
const LOW_TIME_SECS: u64 = 5;
const TIMER_BAR_WIDTH: usize = 40;
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn render(stdout: &mut io::Stdout, app: &App) -> io::Result<()> {
    let (term_width, term_height) = terminal::size()?;

    execute!(
        stdout,
        Hide,
        SetBackgroundColor(app.theme.bg),
        Clear(ClearType::All)
    )?;

    match app.screen_state {
        ScreenState::Login => render_login_screen(stdout, app, term_width, term_height)?,
        ScreenState::Game => render_game_screen(stdout, app, term_width, term_height)?,
        ScreenState::GameOver => render_game_over_screen(stdout, app, term_width, term_height)?,
        ScreenState::Profile => render_profile_screen(stdout, app, term_width, term_height)?,
        ScreenState::Leaderboard => {
            render_leaderboard_screen(stdout, app, term_width, term_height)?
        }
        ScreenState::Settings => render_settings_screen(stdout, app, term_width, term_height)?,
    }

    if let Some(ref msg) = app.message {
        render_message(stdout, app, msg, term_width)?;
    }

    Ok(())
}

/// Format seconds as m:ss
pub fn format_time(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn centered_x(term_width: u16, text: &str) -> u16 {
    term_width.saturating_sub(text.chars().count() as u16) / 2
}

fn render_title(stdout: &mut io::Stdout, app: &App, title: &str, term_width: u16) -> io::Result<()> {
    let title = format!("═══ {} ═══", title);
    execute!(
        stdout,
        MoveTo(centered_x(term_width, &title), 1),
        SetForegroundColor(app.theme.key),
        Print(&title)
    )
}

/// Key hints along the bottom: `[(key, label), ...]`
fn render_footer(
    stdout: &mut io::Stdout,
    app: &App,
    keys: &[(&str, &str)],
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let y = term_height.saturating_sub(2);
    execute!(
        stdout,
        MoveTo(4, y.saturating_sub(1)),
        SetForegroundColor(theme.border),
        Print("─".repeat(60)),
        MoveTo(4, y)
    )?;
    for (key, label) in keys {
        execute!(
            stdout,
            SetForegroundColor(theme.key),
            Print(key),
            SetForegroundColor(theme.info),
            Print(format!(" {}  ", label))
        )?;
    }
    Ok(())
}

fn render_message(stdout: &mut io::Stdout, app: &App, msg: &str, term_width: u16) -> io::Result<()> {
    let theme = &app.theme;
    let padded = format!("  {}  ", msg);

    execute!(
        stdout,
        MoveTo(centered_x(term_width, &padded), 0),
        SetForegroundColor(theme.fg),
        SetBackgroundColor(theme.selected_bg),
        Print(&padded),
        SetBackgroundColor(theme.bg)
    )
}

// ==================== Login ====================

fn render_login_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let form = &app.login;

    let title = match form.mode {
        LoginMode::SignIn => "SIGN IN",
        LoginMode::SignUp => "CREATE ACCOUNT",
    };
    render_title(stdout, app, title, term_width)?;

    let x = term_width.saturating_sub(44) / 2;
    let mut y = 4;

    let fields: &[(LoginField, &str)] = match form.mode {
        LoginMode::SignIn => &[(LoginField::Email, "Email"), (LoginField::Password, "Password")],
        LoginMode::SignUp => &[
            (LoginField::Name, "Name"),
            (LoginField::Email, "Email"),
            (LoginField::Password, "Password"),
        ],
    };

    for &(field, label) in fields {
        let value = match field {
            LoginField::Email => form.email.clone(),
            LoginField::Password => "*".repeat(form.password.chars().count()),
            LoginField::Name => form.name.clone(),
        };
        let focused = field == form.field;
        let bg = if focused { theme.selected_bg } else { theme.bg };

        execute!(
            stdout,
            MoveTo(x, y),
            SetForegroundColor(theme.info),
            Print(format!("{:<10}", label)),
            SetBackgroundColor(bg),
            SetForegroundColor(theme.fg),
            Print(format!(" {:<31}", value)),
            SetBackgroundColor(theme.bg)
        )?;
        y += 2;
    }

    if let Some(ref error) = form.error {
        execute!(
            stdout,
            MoveTo(x, y),
            SetForegroundColor(theme.error),
            Print(error)
        )?;
    }

    let switch_label = match form.mode {
        LoginMode::SignIn => "Create account",
        LoginMode::SignUp => "Sign in instead",
    };
    render_footer(
        stdout,
        app,
        &[
            ("Tab", "Next field"),
            ("Enter", "Submit"),
            ("F2", switch_label),
            ("Esc", "Quit"),
        ],
        term_height,
    )
}

// ==================== Game ====================

fn render_game_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let session = &app.session;
    let ready = session.phase() == SessionPhase::Ready;

    render_title(stdout, app, "MATH QUIZ", term_width)?;
    if let Some(user) = &app.user {
        let name = format!("{} ", user.display_name);
        execute!(
            stdout,
            MoveTo(term_width.saturating_sub(name.chars().count() as u16 + 2), 1),
            SetForegroundColor(theme.info),
            Print(name)
        )?;
    }

    let x = term_width.saturating_sub(TIMER_BAR_WIDTH as u16 + 12) / 2;

    // Settings row, dimmed once the countdown runs
    let locked = if ready { theme.fg } else { theme.border };
    execute!(stdout, MoveTo(x, 4), SetForegroundColor(theme.info), Print("Level  "))?;
    for &difficulty in Difficulty::all() {
        let color = if difficulty == session.difficulty() {
            theme.key
        } else {
            locked
        };
        execute!(
            stdout,
            SetForegroundColor(color),
            Print(format!(" {} ", difficulty))
        )?;
    }
    execute!(stdout, MoveTo(x, 5), SetForegroundColor(theme.info), Print("Time   "))?;
    for &secs in DURATION_CHOICES.iter() {
        let color = if secs == session.duration_secs() {
            theme.key
        } else {
            locked
        };
        execute!(stdout, SetForegroundColor(color), Print(format!(" {}s ", secs)))?;
    }

    // Countdown bar
    let filled = (session.time_fraction() * TIMER_BAR_WIDTH as f64).round() as usize;
    let bar_color = if session.remaining_secs() <= LOW_TIME_SECS {
        theme.timer_low
    } else {
        theme.timer
    };
    execute!(
        stdout,
        MoveTo(x, 7),
        SetForegroundColor(bar_color),
        Print("█".repeat(filled.min(TIMER_BAR_WIDTH))),
        SetForegroundColor(theme.border),
        Print("░".repeat(TIMER_BAR_WIDTH.saturating_sub(filled))),
        SetForegroundColor(theme.fg),
        Print(format!(" {:>3}s", session.remaining_secs())),
        MoveTo(x, 8),
        SetForegroundColor(theme.info),
        Print("Score "),
        SetForegroundColor(theme.success),
        Print(session.score())
    )?;

    // Problem and typed answer
    let problem = app.quiz.problem();
    let question = format!("{} = ", problem.display());
    let blanks = problem
        .answer_digits()
        .saturating_sub(app.quiz.input().chars().count());
    let width = question.chars().count() + problem.answer_digits();
    let px = term_width.saturating_sub(width as u16) / 2;
    execute!(
        stdout,
        MoveTo(px, 11),
        SetForegroundColor(theme.problem),
        Print(&question),
        SetForegroundColor(theme.input),
        Print(app.quiz.input()),
        SetForegroundColor(theme.border),
        Print("_".repeat(blanks))
    )?;

    if let Some((answered, outcome)) = app.quiz.last_outcome() {
        let (mark, color) = if outcome.is_correct {
            ("✓", theme.success)
        } else {
            ("✗", theme.error)
        };
        let line = format!("{} {} = {}", mark, answered.display(), answered.correct_result);
        execute!(
            stdout,
            MoveTo(centered_x(term_width, &line), 13),
            SetForegroundColor(color),
            Print(line)
        )?;
    }

    if ready {
        let hint = "Type an answer to start the clock";
        execute!(
            stdout,
            MoveTo(centered_x(term_width, hint), 15),
            SetForegroundColor(theme.info),
            Print(hint)
        )?;
        render_footer(
            stdout,
            app,
            &[
                ("←/→", "Level"),
                ("↑/↓", "Time"),
                ("b", "Leaderboard"),
                ("i", "Profile"),
                ("s", "Settings"),
                ("o", "Sign out"),
                ("q", "Quit"),
            ],
            term_height,
        )
    } else {
        render_footer(
            stdout,
            app,
            &[("0-9", "Answer"), ("Backspace", "Erase"), ("Esc", "Abandon")],
            term_height,
        )
    }
}

fn render_game_over_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    render_title(stdout, app, "TIME'S UP", term_width)?;

    if let Some(result) = &app.last_result {
        let score = format!("Score: {}", result.score);
        let detail = format!(
            "{} · {}s · {} answered",
            result.difficulty,
            result.duration_seconds,
            app.session.attempts()
        );
        execute!(
            stdout,
            MoveTo(centered_x(term_width, &score), 4),
            SetForegroundColor(theme.success),
            Print(&score),
            MoveTo(centered_x(term_width, &detail), 5),
            SetForegroundColor(theme.info),
            Print(&detail)
        )?;
    }

    let (status, color) = match &app.save_state {
        SaveState::Idle => (String::new(), theme.info),
        SaveState::Pending => ("Saving results...".to_string(), theme.info),
        SaveState::Saved(stats) => (
            format!(
                "Saved · {} games · average {} · best {}",
                stats.total_games, stats.average_score, stats.highest_score
            ),
            theme.fg,
        ),
        SaveState::Failed(e) => (format!("Could not save results: {}", e), theme.error),
    };
    execute!(
        stdout,
        MoveTo(centered_x(term_width, &status), 7),
        SetForegroundColor(color),
        Print(&status)
    )?;

    render_footer(
        stdout,
        app,
        &[
            ("Enter", "Play again"),
            ("b", "Leaderboard"),
            ("i", "Profile"),
            ("q", "Quit"),
        ],
        term_height,
    )
}

// ==================== Profile ====================

fn sparkline(values: &[u64]) -> String {
    let max = values.iter().copied().max().unwrap_or(0);
    values
        .iter()
        .map(|&v| {
            if max == 0 {
                SPARK_LEVELS[0]
            } else {
                let idx = (v * (SPARK_LEVELS.len() as u64 - 1) + max / 2) / max;
                SPARK_LEVELS[idx as usize]
            }
        })
        .collect()
}

fn render_profile_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    render_title(stdout, app, "PROFILE", term_width)?;

    let Some(profile) = &app.profile else {
        execute!(
            stdout,
            MoveTo(4, 4),
            SetForegroundColor(theme.border),
            Print("No profile loaded.")
        )?;
        return render_footer(stdout, app, &[("Esc", "Back")], term_height);
    };
    let stats: &UserStatistics = &profile.stats;

    execute!(
        stdout,
        MoveTo(4, 3),
        SetForegroundColor(theme.fg),
        Print(&profile.name),
        SetForegroundColor(theme.info),
        Print(format!("  {}", profile.email))
    )?;

    let totals = [
        ("Games", stats.total_games.to_string()),
        ("Total score", stats.total_score.to_string()),
        ("Average", stats.average_score.to_string()),
        ("Best", stats.highest_score.to_string()),
        ("Correct", stats.total_correct.to_string()),
        ("Time played", format_time(stats.total_time_played)),
    ];
    for (i, (label, value)) in totals.iter().enumerate() {
        let y = 5 + i as u16;
        execute!(
            stdout,
            MoveTo(4, y),
            SetForegroundColor(theme.info),
            Print(format!("{:<12}", label)),
            SetForegroundColor(theme.key),
            Print(format!("{:>8}", value))
        )?;
    }

    // Per-operation accuracy
    let ops = [
        ("Addition", &stats.by_operation.addition),
        ("Multiplication", &stats.by_operation.multiplication),
    ];
    for (i, (label, op)) in ops.iter().enumerate() {
        execute!(
            stdout,
            MoveTo(30, 5 + i as u16),
            SetForegroundColor(theme.info),
            Print(format!("{:<15}", label)),
            SetForegroundColor(theme.fg),
            Print(format!("{:>3}% of {}", op.accuracy_percent(), op.total))
        )?;
    }

    // Per-difficulty buckets
    execute!(
        stdout,
        MoveTo(30, 8),
        SetForegroundColor(theme.info),
        Print(format!("{:<8} {:>6} {:>8}", "Level", "Games", "Avg")),
    )?;
    for (i, &difficulty) in Difficulty::all().iter().enumerate() {
        let bucket = stats.by_difficulty.get(difficulty);
        execute!(
            stdout,
            MoveTo(30, 9 + i as u16),
            SetForegroundColor(theme.fg),
            Print(format!(
                "{:<8} {:>6} {:>8}",
                difficulty, bucket.total, bucket.avg_score
            ))
        )?;
    }

    // Score history, oldest first
    let history: Vec<u64> = stats.score_history.iter().map(|h| h.score).collect();
    execute!(
        stdout,
        MoveTo(4, 12),
        SetForegroundColor(theme.info),
        Print("History  "),
        SetForegroundColor(theme.success),
        Print(sparkline(&history))
    )?;

    // Recent activity, newest first
    let list_y = 14;
    execute!(
        stdout,
        MoveTo(4, list_y),
        SetForegroundColor(theme.fg),
        Print(format!(
            "{:<12} {:<8} {:>6} {:>6}",
            "Date", "Level", "Score", "Time"
        )),
        MoveTo(4, list_y + 1),
        SetForegroundColor(theme.border),
        Print("─".repeat(36))
    )?;
    let max_rows = term_height.saturating_sub(list_y + 5) as usize;
    for (i, game) in stats.recent_activity.iter().take(max_rows).enumerate() {
        execute!(
            stdout,
            MoveTo(4, list_y + 2 + i as u16),
            SetForegroundColor(theme.info),
            Print(format!(
                "{:<12} {:<8} {:>6} {:>6}",
                game.date.format("%Y-%m-%d"),
                game.difficulty,
                game.score,
                format_time(game.time)
            ))
        )?;
    }
    if stats.recent_activity.is_empty() {
        execute!(
            stdout,
            MoveTo(4, list_y + 2),
            SetForegroundColor(theme.border),
            Print("No games yet. Play one!")
        )?;
    }

    render_footer(
        stdout,
        app,
        &[("b", "Leaderboard"), ("s", "Settings"), ("Esc", "Back")],
        term_height,
    )
}

// ==================== Leaderboard ====================

fn render_filter_row<T: Copy + PartialEq + std::fmt::Display>(
    stdout: &mut io::Stdout,
    app: &App,
    y: u16,
    label: &str,
    values: &[T],
    current: Option<T>,
) -> io::Result<()> {
    let theme = &app.theme;
    execute!(
        stdout,
        MoveTo(4, y),
        SetForegroundColor(theme.info),
        Print(format!("{:<11}◀ ", label))
    )?;

    let all_color = if current.is_none() { theme.key } else { theme.border };
    execute!(stdout, SetForegroundColor(all_color), Print(" ALL "))?;
    for &value in values {
        let color = if Some(value) == current {
            theme.key
        } else {
            theme.border
        };
        execute!(stdout, SetForegroundColor(color), Print(format!(" {} ", value)))?;
    }
    execute!(stdout, SetForegroundColor(theme.info), Print(" ▶"))
}

fn render_leaderboard_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    render_title(stdout, app, "LEADERBOARD", term_width)?;

    let filter = &app.leaderboard_filter;
    render_filter_row(stdout, app, 3, "Difficulty", Difficulty::all(), filter.difficulty)?;
    render_filter_row(stdout, app, 4, "Time", TimeBand::all(), filter.time_band)?;

    let header_y = 6;
    execute!(
        stdout,
        MoveTo(4, header_y),
        SetForegroundColor(theme.fg),
        Print(format!(
            "{:>4} {:<14} {:>7} {:>5} {:<7} {:>5} {:<10}",
            "Rank", "Player", "Score", "Best", "Level", "Time", "Date"
        )),
        MoveTo(4, header_y + 1),
        SetForegroundColor(theme.border),
        Print("─".repeat(60))
    )?;

    let max_entries = term_height.saturating_sub(header_y + 5) as usize;
    let you = app.user.as_ref().map(|u| u.uid.as_str());

    for (i, entry) in app.leaderboard.iter().take(max_entries).enumerate() {
        let y = header_y + 2 + i as u16;
        let rank_color = match i {
            0 => Color::Yellow, // Gold
            1 => Color::Grey,   // Silver
            2 => Color::Rgb {
                r: 205,
                g: 127,
                b: 50,
            }, // Bronze
            _ => theme.info,
        };
        let name_color = if Some(entry.user_id.as_str()) == you {
            theme.success
        } else {
            theme.fg
        };
        let name: String = entry.name.chars().take(14).collect();

        execute!(
            stdout,
            MoveTo(4, y),
            SetForegroundColor(rank_color),
            Print(format!("{:>4}", i + 1)),
            SetForegroundColor(name_color),
            Print(format!(" {:<14}", name)),
            SetForegroundColor(theme.key),
            Print(format!(" {:>7.1}", entry.score)),
            SetForegroundColor(theme.info),
            Print(format!(
                " {:>5} {:<7} {:>5} {:<10}",
                entry.highest_score,
                entry.difficulty,
                format_time(entry.time),
                entry.date.format("%Y-%m-%d")
            ))
        )?;
    }

    if app.leaderboard.is_empty() {
        execute!(
            stdout,
            MoveTo(4, header_y + 3),
            SetForegroundColor(theme.border),
            Print("No entries yet. Play some games!")
        )?;
    }

    render_footer(
        stdout,
        app,
        &[
            ("←/→", "Difficulty"),
            ("↑/↓", "Time"),
            ("i", "Profile"),
            ("Esc", "Back"),
        ],
        term_height,
    )
}

// ==================== Settings ====================

fn render_settings_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let form = &app.settings_form;
    render_title(stdout, app, "SETTINGS", term_width)?;

    let on_off = |b: bool| if b { "On" } else { "Off" };
    let x = term_width.saturating_sub(44) / 2;

    for (i, row) in SettingsRow::ALL.iter().enumerate() {
        let (label, value) = match row {
            SettingsRow::Name => ("Name", form.name.clone()),
            SettingsRow::Theme => ("Theme", form.settings.theme.to_string()),
            SettingsRow::Sound => ("Sound", on_off(form.settings.sound).to_string()),
            SettingsRow::Notifications => {
                ("Notifications", on_off(form.settings.notifications).to_string())
            }
        };
        let bg = if i == form.row { theme.selected_bg } else { theme.bg };
        execute!(
            stdout,
            MoveTo(x, 4 + i as u16 * 2),
            SetForegroundColor(theme.info),
            Print(format!("{:<15}", label)),
            SetBackgroundColor(bg),
            SetForegroundColor(theme.fg),
            Print(format!(" {:<26}", value)),
            SetBackgroundColor(theme.bg)
        )?;
    }

    if let Some(user) = &app.user {
        execute!(
            stdout,
            MoveTo(x, 12),
            SetForegroundColor(theme.info),
            Print(format!("{:<15} {}", "Email", user.email))
        )?;
    }

    if let Some(status) = &form.status {
        let (text, color) = match status {
            Ok(text) => (text.as_str(), theme.success),
            Err(text) => (text.as_str(), theme.error),
        };
        execute!(
            stdout,
            MoveTo(x, 14),
            SetForegroundColor(color),
            Print(text)
        )?;
    }

    render_footer(
        stdout,
        app,
        &[
            ("↑/↓", "Select"),
            ("←/→", "Change"),
            ("Enter", "Save"),
            ("Esc", "Back"),
        ],
        term_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(45), "0:45");
        assert_eq!(format_time(3725), "62:05");
    }

    #[test]
    fn test_sparkline_scales_to_max() {
        assert_eq!(sparkline(&[]), "");
        assert_eq!(sparkline(&[0, 0]), "▁▁");
        assert_eq!(sparkline(&[0, 7, 14]), "▁▅█");
    }
}
