use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;
use web_sys::HtmlInputElement;

use support_core::ticket::{status_path, TicketDraft, TicketWizard, WizardStep};
use support_core::validation::Field;

use crate::api::{go_to, read_file};
use crate::state::SupportState;

const CATEGORIES: [(&str, &str); 4] = [
    ("technical", "Technical problem"),
    ("billing", "Billing"),
    ("account", "Account"),
    ("other", "Something else"),
];

const PRIORITIES: [(&str, &str); 4] = [
    ("low", "Low"),
    ("medium", "Medium"),
    ("high", "High"),
    ("critical", "Critical"),
];

/// Three-step support ticket form. Only rendered for logged-in users.
#[component]
pub fn TicketForm() -> impl IntoView {
    let state = expect_context::<SupportState>();
    let wizard = RwSignal::new(TicketWizard::new(state.config().max_attachment_bytes));
    let step = Memo::new(move |_| wizard.with(TicketWizard::step));
    let identified = RwSignal::new(false);
    let error = RwSignal::new(None::<String>);

    spawn_local(async move {
        if state.require_login().await.is_some() {
            identified.set(true);
        }
    });

    let submit = move |_: ev::MouseEvent| {
        let Some(submission) = wizard.try_update(TicketWizard::begin_submit).flatten() else {
            return;
        };
        let store = state.ticket_store();
        spawn_local(async move {
            match store.submit_ticket(&submission).await {
                Ok(ticket) => {
                    wizard.update(|w| w.finish(ticket.ticket_number.clone()));
                    go_to(&status_path(&ticket.ticket_number));
                }
                Err(err) => {
                    wizard.update(TicketWizard::fail_submit);
                    if !err.is_handled() {
                        error.set(Some(err.user_message()));
                    }
                }
            }
        });
    };

    view! {
        <Show when=move || identified.get() fallback=|| view! { <div class="loading">"Checking your login…"</div> }>
            <section class="ticket-form">
                <h2>"Contact support"</h2>
                {move || error.get().map(|err| view! { <div class="error-banner">{err}</div> })}
                <StepIndicator wizard=wizard step=step />
                {move || match step.get() {
                    WizardStep::IssueDetails => issue_details(wizard).into_any(),
                    WizardStep::Description => description(wizard, error).into_any(),
                    WizardStep::Review => review(wizard, submit).into_any(),
                    WizardStep::Submitted => {
                        view! { <p class="submitted">"Ticket submitted. Taking you to its status page…"</p> }
                            .into_any()
                    }
                }}
            </section>
        </Show>
    }
}

#[component]
fn StepIndicator(wizard: RwSignal<TicketWizard>, step: Memo<WizardStep>) -> impl IntoView {
    view! {
        <ol class="step-indicator">
            {WizardStep::FORM_STEPS
                .into_iter()
                .map(|target| {
                    view! {
                        <li
                            class:current=move || step.get() == target
                            class:done=move || { step.get() > target }
                            on:click=move |_| {
                                wizard.update(|w| {
                                    w.jump_to(target);
                                });
                            }
                        >
                            {target.label()}
                        </li>
                    }
                })
                .collect_view()}
        </ol>
    }
}

fn issue_details(wizard: RwSignal<TicketWizard>) -> impl IntoView {
    view! {
        <div class="step">
            <label>
                "Category"
                <select
                    prop:value=move || draft_value(wizard, |d| &d.issue_category)
                    on:change=move |ev| edit(wizard, ev, |d, v| d.issue_category = v)
                >
                    <option value="">"Choose a category"</option>
                    {options(&CATEGORIES)}
                </select>
            </label>
            {field_error(wizard, Field::IssueCategory)}

            <label>
                "Title"
                <input
                    type="text"
                    prop:value=move || draft_value(wizard, |d| &d.issue_title)
                    on:input=move |ev| edit(wizard, ev, |d, v| d.issue_title = v)
                />
            </label>
            {field_error(wizard, Field::IssueTitle)}

            <label>
                "Priority"
                <select
                    prop:value=move || draft_value(wizard, |d| &d.priority)
                    on:change=move |ev| edit(wizard, ev, |d, v| d.priority = v)
                >
                    <option value="">"Choose a priority"</option>
                    {options(&PRIORITIES)}
                </select>
            </label>
            {field_error(wizard, Field::Priority)}

            <div class="step-actions">
                <button on:click=move |_| {
                    wizard.update(|w| {
                        w.next();
                    });
                }>"Next"</button>
            </div>
        </div>
    }
}

fn description(wizard: RwSignal<TicketWizard>, error: RwSignal<Option<String>>) -> impl IntoView {
    let on_file = move |ev: ev::Event| {
        let picker = event_target::<HtmlInputElement>(&ev);
        let Some(file) = picker.files().and_then(|files| files.get(0)) else {
            return;
        };
        picker.set_value("");
        spawn_local(async move {
            let part = match read_file(&file).await {
                Ok(part) => part,
                Err(err) => {
                    error.set(Some(format!("Could not read {}: {err}", file.name())));
                    return;
                }
            };
            // The previous selection stays in place.
            match wizard.try_update(|w| w.set_attachment(part)) {
                Some(Err(err)) => error.set(Some(err.to_string())),
                Some(Ok(())) => error.set(None),
                None => {}
            }
        });
    };
    let attachment = move || {
        wizard.with(|w| w.draft().attachment.as_ref().map(|file| file.filename.clone()))
    };

    view! {
        <div class="step">
            <label>
                "What happened?"
                <textarea
                    rows="6"
                    prop:value=move || draft_value(wizard, |d| &d.description)
                    on:input=move |ev| edit(wizard, ev, |d, v| d.description = v)
                />
            </label>
            {field_error(wizard, Field::Description)}

            <label>
                "Steps to reproduce (optional)"
                <textarea
                    rows="4"
                    prop:value=move || draft_value(wizard, |d| &d.steps_to_reproduce)
                    on:input=move |ev| edit(wizard, ev, |d, v| d.steps_to_reproduce = v)
                />
            </label>

            <label class="attach-btn">
                "Attach a file (max 5 MB)"
                <input type="file" on:change=on_file />
            </label>
            {move || attachment().map(|name| view! {
                <div class="attachment-chip">
                    <span>{name}</span>
                    <button on:click=move |_| wizard.update(TicketWizard::clear_attachment)>"Remove"</button>
                </div>
            })}
            {field_error(wizard, Field::Attachment)}

            <div class="step-actions">
                <button on:click=move |_| {
                    wizard.update(|w| {
                        w.back();
                    });
                }>"Back"</button>
                <button on:click=move |_| {
                    wizard.update(|w| {
                        w.next();
                    });
                }>"Next"</button>
            </div>
        </div>
    }
}

fn review(
    wizard: RwSignal<TicketWizard>,
    submit: impl Fn(ev::MouseEvent) + Send + Sync + 'static,
) -> impl IntoView {
    let draft = wizard.with_untracked(|w| w.draft().clone());
    let submitting = move || wizard.with(TicketWizard::is_submitting);

    view! {
        <div class="step review">
            <dl>
                <dt>"Category"</dt>
                <dd>{label_for(&CATEGORIES, &draft.issue_category)}</dd>
                <dt>"Title"</dt>
                <dd>{draft.issue_title}</dd>
                <dt>"Priority"</dt>
                <dd>{label_for(&PRIORITIES, &draft.priority)}</dd>
                <dt>"Description"</dt>
                <dd class="multiline">{draft.description}</dd>
                <dt>"Steps to reproduce"</dt>
                <dd class="multiline">{draft.steps_to_reproduce}</dd>
                <dt>"Attachment"</dt>
                <dd>{draft.attachment.map(|file| file.filename).unwrap_or_else(|| "None".to_string())}</dd>
            </dl>
            <div class="step-actions">
                <button
                    disabled=submitting
                    on:click=move |_| {
                        wizard.update(|w| {
                            w.back();
                        });
                    }
                >
                    "Back"
                </button>
                <button class="submit-btn" disabled=submitting on:click=submit>
                    {move || if submitting() { "Submitting…" } else { "Submit ticket" }}
                </button>
            </div>
        </div>
    }
}

fn draft_value(wizard: RwSignal<TicketWizard>, read: fn(&TicketDraft) -> &String) -> String {
    wizard.with(|w| read(w.draft()).clone())
}

fn edit<E: JsCast>(wizard: RwSignal<TicketWizard>, ev: E, write: fn(&mut TicketDraft, String)) {
    let value = event_target_value(&ev);
    wizard.update(|w| write(w.draft_mut(), value));
}

fn field_error(wizard: RwSignal<TicketWizard>, field: Field) -> impl IntoView {
    move || {
        wizard
            .with(|w| w.errors().message(field))
            .map(|message| view! { <p class="field-error">{message}</p> })
    }
}

fn options(choices: &'static [(&'static str, &'static str)]) -> impl IntoView {
    choices
        .iter()
        .map(|(value, label)| view! { <option value=*value>{*label}</option> })
        .collect_view()
}

fn label_for(choices: &[(&'static str, &'static str)], value: &str) -> String {
    choices
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| value.to_string())
}
