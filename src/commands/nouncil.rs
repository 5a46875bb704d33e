use crate::error::{ErrorKind, ReportError};
use crate::handlers::AppState;
use crate::models::PollStatus;
use crate::report::{NouncillorStats, PollReport, ProposalPollStats};
use log::{error, info};
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::prelude::*;

// Discord rejects message content longer than this.
const MESSAGE_LIMIT: usize = 2000;

pub fn create_nouncil_command(command: &mut CreateApplicationCommand) -> &mut CreateApplicationCommand {
    command
        .name("nouncil")
        .description("Nouncil governance statistics")
        .create_option(|option| {
            option
                .name("poll")
                .description("Results of the Nouncil poll on a proposal")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("proposal")
                        .description("Proposal number")
                        .kind(CommandOptionType::Integer)
                        .min_int_value(0)
                        .required(true)
                })
        })
        .create_option(|option| {
            option
                .name("stats")
                .description("Participation and results across proposal polls")
                .kind(CommandOptionType::SubCommand)
        })
        .create_option(|option| {
            option
                .name("members")
                .description("Participation of the current Nouncil members")
                .kind(CommandOptionType::SubCommand)
        })
        .create_option(|option| {
            option
                .name("member")
                .description("Participation of one Nouncil member")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("user")
                        .description("Nouncil member")
                        .kind(CommandOptionType::User)
                        .required(true)
                })
        })
        .create_option(|option| {
            option
                .name("report")
                .description("Results of a poll by its poll id")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("id")
                        .description("Poll id")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
}

pub async fn handle_nouncil_command(
    state: &AppState,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(subcommand) = command.data.options.first() else {
        return send_ephemeral(ctx, command, "No subcommand provided").await;
    };

    // Proposal lookups can be slow, so acknowledge first and edit the reply in.
    command
        .create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::DeferredChannelMessageWithSource)
        })
        .await?;

    let content = match subcommand.name.as_str() {
        "poll" => match proposal_option(subcommand) {
            Some(proposal_id) => {
                info!("Building report for proposal {}", proposal_id);
                match state
                    .assembler
                    .report_for_proposal(&state.channel_id, proposal_id)
                    .await
                {
                    Ok(report) => render_report(&report),
                    Err(e) => render_error(&e),
                }
            }
            None => "A proposal number is required.".to_string(),
        },
        "stats" => match state.assembler.proposal_poll_stats(&state.channel_id).await {
            Ok(stats) => render_stats(&stats),
            Err(e) => render_error(&e),
        },
        "members" => match state.assembler.nouncillors(&state.channel_id).await {
            Ok(members) => render_members(&members),
            Err(e) => render_error(&e),
        },
        "member" => match string_option(subcommand, "user") {
            Some(user_id) => match state.assembler.nouncillor(&state.channel_id, user_id).await {
                Ok(member) => render_member(&member),
                Err(e) => render_error(&e),
            },
            None => "A member is required.".to_string(),
        },
        "report" => match string_option(subcommand, "id") {
            Some(poll_id) => {
                info!("Building report for poll {}", poll_id);
                match state.assembler.assemble_report(poll_id).await {
                    Ok(report) => render_report(&report),
                    Err(e) => render_error(&e),
                }
            }
            None => "A poll id is required.".to_string(),
        },
        _ => "Unknown subcommand".to_string(),
    };

    command
        .edit_original_interaction_response(&ctx.http, |response| {
            response.content(truncate_for_discord(content))
        })
        .await?;
    Ok(())
}

fn proposal_option(subcommand: &CommandDataOption) -> Option<u64> {
    subcommand
        .options
        .iter()
        .find(|option| option.name == "proposal")
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_u64())
}

// User options arrive as the user's id string.
fn string_option<'a>(subcommand: &'a CommandDataOption, name: &str) -> Option<&'a str> {
    subcommand
        .options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_str())
}

pub fn render_report(report: &PollReport) -> String {
    if let Some(formatted) = &report.vote_reasons_formatted {
        return formatted.clone();
    }

    let note = match report.status {
        PollStatus::Cancelled => "It will not produce a result.",
        _ => "Results are published once it closes.",
    };
    let counts = &report.vote_result.counts;
    format!(
        "{}\n\nThe poll is {}. {}\n\nFor: {}, Against: {}, Abstain: {}",
        report.title, report.status, note, counts.for_votes, counts.against_votes, counts.abstain_votes
    )
}

pub fn render_stats(stats: &[ProposalPollStats]) -> String {
    if stats.is_empty() {
        return "No proposal polls found.".to_string();
    }

    let mut output = String::from("```\nProp  Eligible  Voted  For  Against  Abstain\n");
    for row in stats {
        output.push_str(&format!(
            "{:<5} {:>8} {:>6} {:>4} {:>8} {:>8}\n",
            row.proposal_id,
            row.users_eligible,
            row.users_participated,
            row.for_votes,
            row.against_votes,
            row.abstain_votes
        ));
    }
    output.push_str("```");
    output
}

pub fn render_members(members: &[NouncillorStats]) -> String {
    let mut output = format!("{} Nouncil members:\n```\n", members.len());
    output.push_str(&format!("{:<24} {:>7} {:>7}\n", "Member", "Voted", "Rate"));
    for member in members {
        output.push_str(&format!(
            "{:<24} {:>7} {:>6.1}%\n",
            member_label(member),
            format!("{}/{}", member.polls_participated, member.polls_eligible),
            member.participation_rate * 100.0
        ));
    }
    output.push_str("```");
    output
}

pub fn render_member(member: &NouncillorStats) -> String {
    format!(
        "**{}** voted in {} of {} polls ({:.1}%).",
        member_label(member),
        member.polls_participated,
        member.polls_eligible,
        member.participation_rate * 100.0
    )
}

// Members without a recorded name fall back to their Discord id.
fn member_label(member: &NouncillorStats) -> &str {
    if member.display_name.is_empty() {
        &member.voter_id
    } else {
        &member.display_name
    }
}

pub fn render_error(err: &ReportError) -> String {
    match err.kind() {
        ErrorKind::NotFound => format!("Not found: {}", err),
        ErrorKind::UpstreamUnavailable => {
            "Proposal data is unavailable right now, please try again later.".to_string()
        }
        ErrorKind::DataIntegrity | ErrorKind::Internal => {
            error!("Failed to build Nouncil report: {}", err);
            "Encountered an error while processing poll results.".to_string()
        }
    }
}

pub fn truncate_for_discord(content: String) -> String {
    if content.chars().count() <= MESSAGE_LIMIT {
        return content;
    }
    let mut truncated: String = content.chars().take(MESSAGE_LIMIT - 3).collect();
    truncated.push_str("...");
    truncated
}

async fn send_ephemeral(
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    message: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|data| data.content(message).ephemeral(true))
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReferenceData, VoteResult};
    use crate::voting::{PollOutcome, VoteCounts};

    fn open_report() -> PollReport {
        PollReport {
            title: "Prop 81: Later".to_string(),
            description: String::new(),
            time_start: 0,
            time_end: 1,
            status: PollStatus::Open,
            reference_data: ReferenceData {
                nouns_prop_id: "81".to_string(),
                nouns_prop_start: 1,
                nouns_prop_end: 2,
            },
            public_vote_feed: Vec::new(),
            vote_result: VoteResult {
                counts: VoteCounts { for_votes: 3, against_votes: 1, abstain_votes: 0 },
                outcome: PollOutcome { winner: None, description: None },
            },
            vote_participation: None,
            vote_reasons_formatted: None,
        }
    }

    #[test]
    fn open_report_shows_running_counts() {
        let text = render_report(&open_report());
        assert!(text.starts_with("Prop 81: Later\n\nThe poll is open."));
        assert!(text.ends_with("For: 3, Against: 1, Abstain: 0"));
    }

    #[test]
    fn cancelled_report_promises_no_result() {
        let mut report = open_report();
        report.status = PollStatus::Cancelled;
        let text = render_report(&report);
        assert!(text.starts_with("Prop 81: Later\n\nThe poll is cancelled. It will not produce a result."));
        assert!(!text.contains("once it closes"));
    }

    #[test]
    fn closed_report_uses_formatted_summary() {
        let mut report = open_report();
        report.vote_reasons_formatted = Some("summary".to_string());
        assert_eq!(render_report(&report), "summary");
    }

    #[test]
    fn stats_render_as_table() {
        let text = render_stats(&[ProposalPollStats {
            proposal_id: 80,
            users_eligible: 5,
            users_participated: 4,
            for_votes: 2,
            against_votes: 1,
            abstain_votes: 1,
        }]);
        assert!(text.starts_with("```\nProp"));
        assert!(text.contains("80           5      4    2        1        1\n"));
        assert_eq!(render_stats(&[]), "No proposal polls found.");
    }

    fn member(voter_id: &str, display_name: &str, participated: usize, eligible: usize) -> NouncillorStats {
        NouncillorStats {
            voter_id: voter_id.to_string(),
            display_name: display_name.to_string(),
            polls_eligible: eligible,
            polls_participated: participated,
            participation_rate: participated as f64 / eligible as f64,
        }
    }

    #[test]
    fn members_render_with_rates() {
        let text = render_members(&[member("1001", "Alice", 3, 4), member("1002", "", 1, 4)]);
        assert!(text.starts_with("2 Nouncil members:\n```\nMember"));
        assert!(text.contains(&format!("{:<24}     3/4   75.0%\n", "Alice")));
        assert!(text.contains(&format!("{:<24}     1/4   25.0%\n", "1002")));
        assert!(text.ends_with("```"));
    }

    #[test]
    fn single_member_summary() {
        assert_eq!(
            render_member(&member("1001", "Alice", 2, 3)),
            "**Alice** voted in 2 of 3 polls (66.7%)."
        );
    }

    #[test]
    fn errors_are_worded_by_kind() {
        assert_eq!(
            render_error(&ReportError::ProposalPollNotFound(81)),
            "Not found: no proposal poll found for proposal 81"
        );
        assert!(render_error(&ReportError::ReportUnavailable("timeout".into())).contains("try again"));
    }

    #[test]
    fn long_messages_are_truncated() {
        let text = truncate_for_discord("x".repeat(MESSAGE_LIMIT + 10));
        assert_eq!(text.chars().count(), MESSAGE_LIMIT);
        assert!(text.ends_with("..."));
        assert_eq!(truncate_for_discord("short".to_string()), "short");
    }
}
