//! Terminal front end: dispatches CLI commands and walks the user through
//! the interactive flows (payment modal, room creation, join by code).
//!
//! Human-facing output goes to the [`Terminal`] writer; logs go through
//! `tracing` to stderr.

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;

use clap::CommandFactory;
use colored::*;
use tracing::{debug, info};

use crate::admin::{AdminPanel, AdminPayment, AdminPost, AdminTopic, AdminUser, ModeratorApplication};
use crate::api::ApiClient;
use crate::cli::{
    AdminCommand, Args, Command, ModerationAction, ModeratorAction, PaymentAction, TopicAction,
    UserAction,
};
use crate::config::ClientConfig;
use crate::error::{AnosunuError, Result};
use crate::feed::{Post, PostQuery};
use crate::payment::{
    format_amount, ConfirmationFields, ModalState, PaymentGateway, PaymentModal,
    PaymentStatusPayload,
};
use crate::poll::PollConfig;
use crate::rooms::{
    CreationStep, JoinError, JoinFlow, JoinGateway, JoinState, RoomCatalog, RoomCreationFlow,
    RoomDraft, RoomReadyView, Tone,
};
use crate::session::{FileSessionStore, SessionContext, SessionStore};

/// Pause between the reactivation notice and entering the room.
pub const REACTIVATION_NOTICE_DELAY: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// Line-oriented prompt over any reader/writer pair.
pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Print `prompt` and read one trimmed line. End of input reads as empty.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt} ")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// Yes/no question; anything but `o`, `oui`, `y` or `yes` is a no.
    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.ask(&format!("{prompt} [o/N]"))?;
        Ok(matches!(
            answer.to_lowercase().as_str(),
            "o" | "oui" | "y" | "yes"
        ))
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

fn toned(tone: Tone, text: &str) -> ColoredString {
    match tone {
        Tone::Info => text.cyan(),
        Tone::Warning => text.yellow(),
        Tone::Error => text.red(),
    }
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// Walk the payment modal to completion.
///
/// Returns the verification payload, or `None` when the user walked away
/// (declined, gave up on the form, or pressed Ctrl+C while waiting).
pub async fn run_payment<G, R, W>(
    term: &mut Terminal<R, W>,
    gateway: &G,
    modal: &mut PaymentModal,
) -> Result<Option<PaymentStatusPayload>>
where
    G: PaymentGateway,
    R: BufRead,
    W: Write,
{
    let amount = format_amount(modal.descriptor().amount);

    if modal.state() == ModalState::TestMode {
        term.say(format!("{} Montant : {amount}", "[mode test]".magenta().bold()))?;
        if !term.confirm("Activer l'accès sans paiement ?")? {
            modal.cancel();
            return Ok(None);
        }
        let mut verified = None;
        modal.grant_test_access(|p| verified = Some(p))?;
        return Ok(verified);
    }

    loop {
        term.say(format!(
            "{} {amount} via {}",
            "Paiement requis :".bold(),
            modal.descriptor().provider
        ))?;
        if let Some(link) = modal.external_link() {
            term.say(format!("Payez ici : {}", link.underline()))?;
        }
        if !term.confirm("Avez-vous déjà payé ?")? {
            modal.cancel();
            return Ok(None);
        }
        modal.already_paid()?;

        if !submit_receipt(term, gateway, modal).await? {
            modal.cancel();
            return Ok(None);
        }

        term.say("Vérification du paiement en cours… (Ctrl+C pour annuler)".dimmed())?;
        let mut verified = None;
        let outcome = tokio::select! {
            r = modal.wait_for_verification(gateway, |p| verified = Some(p)) => Some(r),
            Ok(()) = tokio::signal::ctrl_c() => None,
        };
        match outcome {
            Some(Ok(())) => {
                term.say("Paiement vérifié.".green().bold())?;
                return Ok(verified);
            }
            Some(Err(e @ AnosunuError::PaymentNotCompleted { .. })) => {
                term.say(e.user_message().yellow())?;
            }
            Some(Err(e)) => return Err(e),
            None => {
                modal.cancel();
                term.say("Vérification annulée.".yellow())?;
                return Ok(None);
            }
        }
    }
}

/// Read the four receipt fields until the server accepts them.
/// `false` when the user gives up.
async fn submit_receipt<G, R, W>(
    term: &mut Terminal<R, W>,
    gateway: &G,
    modal: &mut PaymentModal,
) -> Result<bool>
where
    G: PaymentGateway,
    R: BufRead,
    W: Write,
{
    loop {
        let fields = ConfirmationFields {
            phone_prefix: term.ask("Indicatif du numéro (2-3 chiffres) :")?,
            phone_last2: term.ask("2 derniers chiffres du numéro :")?,
            transaction_last4: term.ask("4 derniers caractères de la transaction :")?,
            actual_amount_paid: term.ask("Montant payé :")?,
        };
        match modal.submit_confirmation(gateway, &fields).await {
            Ok(()) => return Ok(true),
            Err(e) => {
                debug!(error = %e, "receipt not accepted");
                term.say(e.user_message().red())?;
                if !term.confirm("Réessayer ?")? {
                    return Ok(false);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

fn print_ready<R: BufRead, W: Write>(term: &mut Terminal<R, W>, view: &RoomReadyView) -> Result<()> {
    term.say(format!("{} {}", "Salle prête :".green().bold(), view.slug))?;
    term.say(format!("  Code d'accès : {}", view.access_code.bold()))?;
    term.say(format!("  Lien d'invitation : {}", view.invite_link))?;
    if let Some(end) = &view.scheduled_end_at {
        term.say(format!("  Fin prévue : {end}"))?;
    }
    Ok(())
}

fn print_catalog<R: BufRead, W: Write>(term: &mut Terminal<R, W>, catalog: &RoomCatalog) -> Result<()> {
    if catalog.is_empty() {
        return term.say("Aucun type de salle disponible.");
    }
    for t in catalog.types() {
        let mark = if catalog.is_subscribed(t.id) {
            "abonné".green()
        } else {
            format_amount(t.price).normal()
        };
        term.say(format!("#{} {} [{mark}]", t.id, t.name.bold()))?;
        if let Some(d) = &t.description {
            term.say(format!("    {d}"))?;
        }
    }
    Ok(())
}

pub async fn subscribe<R: BufRead, W: Write>(
    term: &mut Terminal<R, W>,
    api: &ApiClient,
    poll: PollConfig,
    type_id: u64,
) -> Result<bool> {
    let mut catalog = RoomCatalog::fetch(api).await?;
    if catalog.is_subscribed(type_id) {
        term.say("Vous êtes déjà abonné à ce type de salle.".cyan())?;
        return Ok(true);
    }
    let outcome = api.subscribe_room_type(type_id).await?;
    let mut modal = PaymentModal::new(outcome.into_descriptor(), poll);
    match run_payment(term, api, &mut modal).await? {
        Some(_) => {
            catalog.mark_subscribed(type_id);
            info!(type_id, "subscription active");
            term.say("Abonnement activé.".green().bold())?;
            print_catalog(term, &catalog)?;
            Ok(true)
        }
        None => {
            term.say("Abonnement non activé.".yellow())?;
            Ok(false)
        }
    }
}

/// Create a private room, paying for it first when the server asks.
/// `true` when the room ended up active.
pub async fn create_room<R: BufRead, W: Write>(
    term: &mut Terminal<R, W>,
    api: &ApiClient,
    poll: PollConfig,
    draft: &RoomDraft,
) -> Result<bool> {
    let mut flow = RoomCreationFlow::new(poll);
    match flow.start(api, draft).await? {
        CreationStep::Ready(view) => {
            print_ready(term, &view)?;
            Ok(true)
        }
        CreationStep::Payment(mut modal) => {
            if run_payment(term, api, &mut modal).await?.is_none() {
                if !modal.cancel().room_activated {
                    term.say("La salle reste inactive tant que le paiement n'est pas validé.".yellow())?;
                }
                return Ok(false);
            }
            match flow.after_payment(api, &modal).await? {
                Some(view) => {
                    print_ready(term, &view)?;
                    Ok(true)
                }
                None => {
                    term.say("Paiement validé. La salle sera active dans un instant.".cyan())?;
                    Ok(false)
                }
            }
        }
        CreationStep::Inactive { slug } => {
            term.say(format!("Salle {slug} créée, en attente d'activation.").yellow())?;
            Ok(false)
        }
    }
}

/// Look up, confirm, and (if needed) wait for the owner's approval.
/// Returns the state the flow ended in.
///
/// The approval wait runs on its own task; Ctrl+C drops it and leaves the
/// request queued.
pub async fn join_room<G, R, W>(
    term: &mut Terminal<R, W>,
    gateway: &G,
    poll: PollConfig,
    code: &str,
    assume_yes: bool,
) -> Result<JoinState>
where
    G: JoinGateway + Clone + Send + 'static,
    R: BufRead,
    W: Write,
{
    let mut flow = JoinFlow::new(poll);

    if let Err(e) = flow.lookup(gateway, code).await {
        report_join_error(term, &e)?;
        return Ok(flow.state().clone());
    }
    if let JoinState::Preview { lookup, .. } = flow.state() {
        let mut line = format!("Salle : {}", lookup.room_name.bold());
        if let Some(inviter) = &lookup.inviter_name {
            line.push_str(&format!(" (invité par {inviter})"));
        }
        if let (Some(n), Some(max)) = (lookup.participants_count, lookup.max_participants) {
            line.push_str(&format!(" {n}/{max}"));
        }
        term.say(line)?;
        if lookup.requires_approval {
            term.say("Le propriétaire doit approuver votre demande.".dimmed())?;
        }
    }
    if !assume_yes && !term.confirm("Rejoindre cette salle ?")? {
        flow.reset();
        return Ok(flow.state().clone());
    }

    let confirmed = flow.confirm(gateway).await.map(|_| ());
    if let Err(e) = confirmed {
        report_join_error(term, &e)?;
        return Ok(flow.state().clone());
    }

    match flow.state().clone() {
        JoinState::Joined { slug } => {
            term.say(format!("{} {slug}", "Bienvenue dans la salle".green().bold()))?;
        }
        JoinState::Reactivated { slug, message } => {
            let message = message.unwrap_or_else(|| "Votre accès a été réactivé.".to_string());
            term.say(message.cyan())?;
            tokio::time::sleep(REACTIVATION_NOTICE_DELAY).await;
            term.say(format!("{} {slug}", "Bienvenue dans la salle".green().bold()))?;
        }
        JoinState::Pending { slug } => {
            term.say("Demande envoyée. En attente de validation… (Ctrl+C pour arrêter)".dimmed())?;
            let waiting = flow.spawn_approval_wait(gateway.clone());
            let finished = tokio::select! {
                r = waiting.wait() => r,
                Ok(()) = tokio::signal::ctrl_c() => None,
            };
            let Some((done, outcome)) = finished else {
                term.say("Attente interrompue. Votre demande reste en file.".yellow())?;
                return Ok(JoinState::Pending { slug });
            };
            flow = done;
            match (outcome, flow.state()) {
                (Ok(()), JoinState::Approved { slug }) => {
                    term.say(format!("{} {slug}", "Demande acceptée. Bienvenue dans la salle".green().bold()))?;
                }
                (Ok(()), JoinState::Rejected { reason }) => {
                    let mut line = "Demande refusée.".to_string();
                    if let Some(r) = reason {
                        line.push_str(&format!(" Motif : {r}"));
                    }
                    term.say(line.red())?;
                }
                (Ok(()), _) => {}
                (Err(e @ AnosunuError::Timeout { .. }), _) => {
                    term.say(toned(Tone::Warning, &e.user_message()))?;
                }
                (Err(e), _) => report_join_error(term, &e)?,
            }
        }
        _ => {}
    }
    Ok(flow.state().clone())
}

fn report_join_error<R: BufRead, W: Write>(term: &mut Terminal<R, W>, err: &AnosunuError) -> Result<()> {
    let classified = JoinError::classify(err);
    debug!(kind = ?classified.kind, error = %err, "join failed");
    term.say(toned(classified.tone(), &classified.message))
}

// ---------------------------------------------------------------------------
// Feed and admin printing
// ---------------------------------------------------------------------------

fn print_post<R: BufRead, W: Write>(term: &mut Terminal<R, W>, p: &Post) -> Result<()> {
    let alias = p.alias.as_deref().unwrap_or("anonyme");
    let topic = p
        .topic
        .as_ref()
        .map(|t| format!(" [{}]", t.name))
        .unwrap_or_default();
    let heart = if p.liked_by_me { "♥".red() } else { "♡".normal() };
    term.say(format!("#{}{topic} {}", p.id, alias.bold()))?;
    term.say(format!("  {}", p.content))?;
    term.say(format!("  {heart} {}  commentaires : {}", p.likes_count, p.comments_count).dimmed())
}

trait Row {
    fn line(&self) -> String;
}

impl Row for AdminUser {
    fn line(&self) -> String {
        format!("#{} {} {:?} {:?}", self.id, self.pseudo, self.role, self.status)
    }
}

impl Row for AdminPost {
    fn line(&self) -> String {
        format!(
            "#{} {:?} signalements : {} {}",
            self.id, self.status, self.reports_count, self.content
        )
    }
}

impl Row for AdminTopic {
    fn line(&self) -> String {
        format!("#{} {} ({} posts)", self.id, self.name, self.posts_count)
    }
}

impl Row for AdminPayment {
    fn line(&self) -> String {
        format!(
            "#{} {} {} {:?} {}",
            self.id,
            self.payment_code,
            format_amount(self.amount),
            self.status,
            self.user_pseudo.as_deref().unwrap_or("-")
        )
    }
}

impl Row for ModeratorApplication {
    fn line(&self) -> String {
        format!("#{} {} {:?}", self.id, self.pseudo, self.status)
    }
}

fn print_rows<T: Row, R: BufRead, W: Write>(term: &mut Terminal<R, W>, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        return term.say("(vide)".dimmed());
    }
    for r in rows {
        term.say(r.line())?;
    }
    Ok(())
}

pub async fn admin<R: BufRead, W: Write>(
    term: &mut Terminal<R, W>,
    api: &ApiClient,
    command: &AdminCommand,
) -> Result<()> {
    let mut panel = AdminPanel::new(api);
    match command {
        AdminCommand::Users { action } => {
            panel.load_users().await?;
            match action {
                Some(UserAction::Block { id }) => panel.block_user(*id).await?,
                Some(UserAction::Unblock { id }) => panel.unblock_user(*id).await?,
                Some(UserAction::Delete { id }) => panel.delete_user(*id).await?,
                None => {}
            }
            print_rows(term, panel.users.items())
        }
        AdminCommand::Posts { action } => {
            panel.load_posts().await?;
            match action {
                Some(ModerationAction::Approve { id }) => panel.approve_post(*id).await?,
                Some(ModerationAction::Reject { id }) => panel.reject_post(*id).await?,
                Some(ModerationAction::Delete { id }) => panel.delete_post(*id).await?,
                None => {}
            }
            print_rows(term, panel.posts.items())
        }
        AdminCommand::Topics { action } => {
            panel.load_topics().await?;
            match action {
                Some(TopicAction::Create { name }) => {
                    panel.create_topic(name).await?;
                }
                Some(TopicAction::Delete { id }) => panel.delete_topic(*id).await?,
                None => {}
            }
            print_rows(term, panel.topics.items())
        }
        AdminCommand::Payments { action } => {
            panel.load_payments().await?;
            match action {
                Some(PaymentAction::Approve { id }) => panel.approve_payment(*id).await?,
                Some(PaymentAction::Reject { id }) => panel.reject_payment(*id).await?,
                None => {}
            }
            print_rows(term, panel.payments.items())
        }
        AdminCommand::Moderators { action } => {
            panel.load_moderators().await?;
            match action {
                Some(ModeratorAction::Approve { id }) => panel.approve_moderator(*id).await?,
                Some(ModeratorAction::Reject { id }) => panel.reject_moderator(*id).await?,
                Some(ModeratorAction::Revoke { id }) => panel.revoke_moderator(*id).await?,
                None => {}
            }
            print_rows(term, panel.moderators.items())
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn payment_poll(config: &ClientConfig) -> PollConfig {
    PollConfig::new(config.payment_poll_interval(), config.payment_poll_max_attempts)
}

pub fn join_poll(config: &ClientConfig) -> PollConfig {
    PollConfig::new(config.join_poll_interval(), Some(config.join_poll_max_attempts))
}

fn resolve_config(args: &Args) -> Result<ClientConfig> {
    let config = ClientConfig::load(args.config.as_deref())?;
    match &args.api_url {
        Some(url) => config.with_api_url(url.clone()),
        None => Ok(config),
    }
}

fn exit(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run one CLI command against stdin/stdout.
pub async fn run(args: Args) -> Result<ExitCode> {
    if let Command::Completions { shell } = args.command {
        clap_complete::generate(shell, &mut Args::command(), "anosunu", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let config = resolve_config(&args)?;
    let session_path = config
        .session_path()
        .ok_or_else(|| AnosunuError::Config("no home directory to store the session in".to_string()))?;
    let store = FileSessionStore::new(session_path);
    let session = SessionContext::new(store.load()?);
    let api = ApiClient::new(&config, session)?;
    debug!(api = api.base_url(), "client ready");

    let mut term = Terminal::new(io::BufReader::new(io::stdin()), io::stdout());
    execute(&mut term, &api, &store, &config, args.command).await
}

/// Run one command with an explicit terminal, client and session store.
pub async fn execute<R, W, S>(
    term: &mut Terminal<R, W>,
    api: &ApiClient,
    store: &S,
    config: &ClientConfig,
    command: Command,
) -> Result<ExitCode>
where
    R: BufRead,
    W: Write,
    S: SessionStore,
{
    match command {
        Command::Login { pseudo, password } => {
            let password = match password {
                Some(p) => p,
                None => term.ask("Mot de passe :")?,
            };
            let user = api.login(store, &pseudo, &password).await?;
            term.say(format!("Connecté en tant que {}", user.pseudo.bold()))?;
            if !user.onboarding_completed {
                term.say("Choisissez vos sujets avec `anosunu onboard <id>...`".dimmed())?;
            }
        }
        Command::Logout => {
            api.logout(store).await?;
            term.say("Déconnecté.")?;
        }
        Command::Whoami => {
            if !api.session().snapshot().is_authenticated() {
                term.say("Non connecté.".yellow())?;
                return Ok(ExitCode::FAILURE);
            }
            let user = api.me().await?;
            term.say(format!("{} ({:?})", user.pseudo.bold(), user.role))?;
        }
        Command::Topics => {
            for t in api.topics().await? {
                term.say(format!("#{} {}", t.id, t.name))?;
            }
        }
        Command::Onboard { topic_ids } => {
            api.complete_onboarding(&topic_ids).await?;
            term.say("Sujets enregistrés.".green())?;
        }
        Command::Posts { topic, page } => {
            let posts = api.posts(&PostQuery { topic_id: topic, page }).await?;
            if posts.is_empty() {
                term.say("Aucune publication.".dimmed())?;
            }
            for p in &posts {
                print_post(term, p)?;
            }
        }
        Command::Post { content, topic } => {
            let post = api.create_post(&content, topic).await?;
            term.say(format!("Publication #{} envoyée.", post.id).green())?;
        }
        Command::Comments { post_id } => {
            for c in api.comments(post_id).await? {
                let alias = c.alias.as_deref().unwrap_or("anonyme");
                term.say(format!("{} : {}", alias.bold(), c.content))?;
            }
        }
        Command::Comment { post_id, content } => {
            let c = api.add_comment(post_id, &content).await?;
            term.say(format!("Commentaire #{} envoyé.", c.id).green())?;
        }
        Command::Like { post_id } => {
            let state = api.toggle_like(post_id).await?;
            let verb = if state.liked { "aimée" } else { "n'est plus aimée" };
            term.say(format!("Publication #{post_id} {verb} ({} j'aime)", state.likes_count))?;
        }
        Command::RoomTypes => {
            let catalog = RoomCatalog::fetch(api).await?;
            print_catalog(term, &catalog)?;
        }
        Command::Subscribe { type_id } => {
            return subscribe(term, api, payment_poll(config), type_id)
                .await
                .map(exit);
        }
        Command::CreateRoom {
            name,
            description,
            min,
            max,
            duration,
        } => {
            let draft = RoomDraft {
                name,
                description,
                min_participants: min,
                max_participants: max,
                duration_minutes: duration,
            };
            return create_room(term, api, payment_poll(config), &draft)
                .await
                .map(exit);
        }
        Command::MyRooms => {
            let rooms = api.my_black_rooms().await?;
            if rooms.is_empty() {
                term.say("Aucune salle.".dimmed())?;
            }
            for r in rooms {
                let status = r.status.as_deref().unwrap_or("-");
                term.say(format!("{} {} [{status}]", r.slug, r.name.bold()))?;
                if let Some(code) = r.activation.access_code.as_deref() {
                    term.say(format!("    code : {code}"))?;
                }
            }
        }
        Command::Join { code, yes } => {
            let state = join_room(term, api, join_poll(config), &code, yes).await?;
            let ok = matches!(
                state,
                JoinState::Joined { .. } | JoinState::Reactivated { .. } | JoinState::Approved { .. }
            );
            return Ok(exit(ok));
        }
        Command::Admin { command } => admin(term, api, &command).await?,
        Command::Completions { .. } => {}
    }
    Ok(ExitCode::SUCCESS)
}
