/// Popup UI for Tab Grouper extension

use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::chrome::{self, ChromeHost, ChromeStorage};
use crate::dispatcher::GroupingService;
use crate::provider::{HttpProviders, validate_api_key};
use crate::storage::{self, KEY_API_KEY, KEY_IS_ON, Settings};
use crate::ui::components::{CheckboxRow, Toast, ToastMessage};

#[derive(Clone, PartialEq)]
enum AppState {
    Idle,
    Loading(String),
}

fn service() -> GroupingService<ChromeHost, ChromeStorage, HttpProviders<ChromeStorage>> {
    GroupingService::new(ChromeHost, ChromeStorage, HttpProviders::new(reqwest::Client::new(), ChromeStorage))
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Idle);
    let settings = use_state(Settings::default);
    let api_key = use_state(String::new);
    let toast = use_state(|| None::<ToastMessage>);

    // Load settings on mount
    {
        let settings = settings.clone();
        let api_key = api_key.clone();
        let toast = toast.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match Settings::load(&ChromeStorage).await {
                    Ok(loaded) => {
                        api_key.set(loaded.api_key.clone());
                        settings.set(loaded);
                    }
                    Err(e) => toast.set(Some(ToastMessage::error(format!("Failed to load settings: {}", e)))),
                }
            });
            || ()
        });
    }

    let on_toggle = {
        let settings = settings.clone();
        let toast = toast.clone();
        Callback::from(move |is_on: bool| {
            let mut next = (*settings).clone();
            next.is_on = is_on;
            settings.set(next);

            let toast = toast.clone();
            spawn_local(async move {
                if let Err(e) = storage::set_as(&ChromeStorage, KEY_IS_ON, &is_on).await {
                    toast.set(Some(ToastMessage::error(format!("Failed to save: {}", e))));
                }
            });
        })
    };

    let on_key_input = {
        let api_key = api_key.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                api_key.set(input.value());
            }
        })
    };

    // Save the key, then ask the provider whether it accepts it
    let on_save_key = {
        let state = state.clone();
        let settings = settings.clone();
        let api_key = api_key.clone();
        let toast = toast.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let toast = toast.clone();
            let key = api_key.trim().to_string();
            let mut next = (*settings).clone();
            next.api_key = key.clone();
            settings.set(next.clone());

            state.set(AppState::Loading("Checking API key...".to_string()));

            spawn_local(async move {
                if let Err(e) = storage::set_as(&ChromeStorage, KEY_API_KEY, &key).await {
                    toast.set(Some(ToastMessage::error(format!("Failed to save key: {}", e))));
                    state.set(AppState::Idle);
                    return;
                }

                let check = validate_api_key(&reqwest::Client::new(), &next, &key).await;
                log::info!("API key check: {:?}", check);
                toast.set(Some(check.into()));
                state.set(AppState::Idle);
            });
        })
    };

    let on_group = {
        let state = state.clone();
        let toast = toast.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let toast = toast.clone();

            state.set(AppState::Loading("Grouping tabs...".to_string()));

            spawn_local(async move {
                let result = match chrome::current_window_id().await {
                    Ok(window_id) => service().group_window(window_id).await,
                    Err(e) => Err(e.into()),
                };

                match result {
                    Ok(buckets) => {
                        let grouped: usize = buckets.iter().map(|b| b.tab_ids.len()).sum();
                        toast.set(Some(ToastMessage::success(format!("Grouped {} tabs", grouped))));
                    }
                    Err(e) => {
                        log::error!("Grouping failed: {}", e);
                        toast.set(Some(ToastMessage::error(format!("Grouping failed: {}", e))));
                    }
                }
                state.set(AppState::Idle);
            });
        })
    };

    let on_ungroup = {
        let state = state.clone();
        let toast = toast.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let toast = toast.clone();

            state.set(AppState::Loading("Ungrouping tabs...".to_string()));

            spawn_local(async move {
                let result = match chrome::current_window_id().await {
                    Ok(window_id) => service().ungroup_window(window_id).await,
                    Err(e) => Err(e.into()),
                };

                match result {
                    Ok(count) => toast.set(Some(ToastMessage::success(format!("Ungrouped {} tabs", count)))),
                    Err(e) => toast.set(Some(ToastMessage::error(format!("Ungroup failed: {}", e)))),
                }
                state.set(AppState::Idle);
            });
        })
    };

    let on_options = Callback::from(move |_| {
        spawn_local(async move {
            if let Err(e) = chrome::open_options_page().await {
                log::error!("Failed to open options: {}", e);
            }
        });
    });

    let is_busy = !matches!(*state, AppState::Idle);
    let has_key = !settings.api_key.is_empty();

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Tab Grouper"}</h1>

            <Toast toast={toast.clone()} />

            <CheckboxRow
                label="Group new tabs automatically"
                checked={settings.is_on}
                onchange={on_toggle}
            />

            <div class="key-row">
                <input
                    class="pf-v5-c-form-control"
                    type="password"
                    placeholder={format!("{} API key", settings.service_provider.label())}
                    value={(*api_key).clone()}
                    oninput={on_key_input}
                />
                <Button onclick={on_save_key} disabled={is_busy} variant={ButtonVariant::Secondary}>
                    {"Save"}
                </Button>
            </div>

            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                AppState::Idle => html! {}
            }}

            <div class="flex-column-gap">
                <Button onclick={on_group} disabled={is_busy || !has_key} variant={ButtonVariant::Primary} block={true}>
                    {"Group tabs"}
                </Button>
                <Button onclick={on_ungroup} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                    {"Ungroup all"}
                </Button>
                <Button onclick={on_options} variant={ButtonVariant::Link} block={true}>
                    {"Options"}
                </Button>
            </div>
        </div>
    }
}
