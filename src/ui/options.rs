/// Options page: categories, colors, filter rules, provider and prompt.
/// Every edit is written to storage as soon as it is made, except the prompt
/// which is validated first.

use patternfly_yew::prelude::*;
use serde::Serialize;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};
use yew::prelude::*;

use crate::chrome::ChromeStorage;
use crate::filter::{FilterRuleItem, RuleType};
use crate::prompt;
use crate::provider::ServiceProvider;
use crate::storage::{
    self, DEFAULT_API_URL, DEFAULT_MODEL, KEY_API_URL, KEY_COLORS, KEY_COLORS_ENABLED, KEY_FILTER_RULES,
    KEY_IS_AUTO_POSITION, KEY_MODEL, KEY_PROMPT, KEY_SERVICE_PROVIDER, Settings,
};
use crate::tab_data::TabColor;
use crate::ui::components::{CheckboxRow, Toast, ToastMessage};

type ToastHandle = UseStateHandle<Option<ToastMessage>>;

fn persist<T: Serialize + 'static>(key: &'static str, value: T, toast: ToastHandle) {
    spawn_local(async move {
        if let Err(e) = storage::set_as(&ChromeStorage, key, &value).await {
            log::error!("Failed to save {}: {}", key, e);
            toast.set(Some(ToastMessage::error(format!("Failed to save {}: {}", key, e))));
        }
    });
}

fn input_value(e: &Event) -> Option<String> {
    e.target_dyn_into::<HtmlInputElement>().map(|input| input.value())
}

fn select_value(e: &Event) -> Option<String> {
    e.target_dyn_into::<HtmlSelectElement>().map(|select| select.value())
}

#[function_component(Options)]
pub fn options() -> Html {
    let settings = use_state(Settings::default);
    let prompt_text = use_state(String::new);
    let new_category = use_state(String::new);
    let toast = use_state(|| None::<ToastMessage>);

    // Load settings on mount
    {
        let settings = settings.clone();
        let prompt_text = prompt_text.clone();
        let toast = toast.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match Settings::load(&ChromeStorage).await {
                    Ok(loaded) => {
                        prompt_text.set(loaded.prompt_template().to_string());
                        settings.set(loaded);
                    }
                    Err(e) => toast.set(Some(ToastMessage::error(format!("Failed to load settings: {}", e)))),
                }
            });
            || ()
        });
    }

    // Categories

    let on_rename = {
        let settings = settings.clone();
        let toast = toast.clone();
        move |old: String| {
            let settings = settings.clone();
            let toast = toast.clone();
            Callback::from(move |e: Event| {
                let Some(new) = input_value(&e).map(|v| v.trim().to_string()) else { return };
                if new.is_empty() || new == old || settings.types.contains(&new) {
                    return;
                }
                let mut next = (*settings).clone();
                if next.rename_category(&old, &new) {
                    persist(storage::KEY_TYPES, next.types.clone(), toast.clone());
                    settings.set(next);
                }
            })
        }
    };

    let on_delete = {
        let settings = settings.clone();
        let toast = toast.clone();
        move |index: usize| {
            let settings = settings.clone();
            let toast = toast.clone();
            Callback::from(move |_| {
                let mut next = (*settings).clone();
                if next.remove_category(index) {
                    persist(storage::KEY_TYPES, next.types.clone(), toast.clone());
                    persist(KEY_COLORS, next.colors.clone(), toast.clone());
                    settings.set(next);
                }
            })
        }
    };

    let on_color = {
        let settings = settings.clone();
        let toast = toast.clone();
        move |index: usize| {
            let settings = settings.clone();
            let toast = toast.clone();
            Callback::from(move |e: Event| {
                let Some(color) = select_value(&e).and_then(|v| TabColor::from_name(&v)) else { return };
                let mut next = (*settings).clone();
                next.set_color(index, color);
                persist(KEY_COLORS, next.colors.clone(), toast.clone());
                settings.set(next);
            })
        }
    };

    let on_new_category_input = {
        let new_category = new_category.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                new_category.set(input.value());
            }
        })
    };

    let on_add_category = {
        let settings = settings.clone();
        let new_category = new_category.clone();
        let toast = toast.clone();
        Callback::from(move |_| {
            let name = new_category.trim().to_string();
            let mut next = (*settings).clone();
            if !next.add_category(&name) {
                toast.set(Some(ToastMessage::warning(format!("\"{}\" is empty or already listed", name))));
                return;
            }
            persist(storage::KEY_TYPES, next.types.clone(), toast.clone());
            settings.set(next);
            new_category.set(String::new());
        })
    };

    // Switches

    let on_colors_enabled = {
        let settings = settings.clone();
        let toast = toast.clone();
        Callback::from(move |enabled: bool| {
            let mut next = (*settings).clone();
            next.colors_enabled = enabled;
            persist(KEY_COLORS_ENABLED, enabled, toast.clone());
            settings.set(next);
        })
    };

    let on_auto_position = {
        let settings = settings.clone();
        let toast = toast.clone();
        Callback::from(move |enabled: bool| {
            let mut next = (*settings).clone();
            next.is_auto_position = enabled;
            persist(KEY_IS_AUTO_POSITION, enabled, toast.clone());
            settings.set(next);
        })
    };

    // Provider

    let on_provider = {
        let settings = settings.clone();
        let toast = toast.clone();
        Callback::from(move |e: Event| {
            let Some(provider) = select_value(&e)
                .and_then(|v| ServiceProvider::ALL.into_iter().find(|p| p.label() == v))
            else {
                return;
            };
            let mut next = (*settings).clone();
            next.service_provider = provider;
            persist(KEY_SERVICE_PROVIDER, provider, toast.clone());
            settings.set(next);
        })
    };

    let on_model = {
        let settings = settings.clone();
        let toast = toast.clone();
        Callback::from(move |e: Event| {
            let Some(model) = input_value(&e) else { return };
            let mut next = (*settings).clone();
            next.model = model.trim().to_string();
            persist(KEY_MODEL, next.model.clone(), toast.clone());
            settings.set(next);
        })
    };

    let on_api_url = {
        let settings = settings.clone();
        let toast = toast.clone();
        Callback::from(move |e: Event| {
            let Some(api_url) = input_value(&e) else { return };
            let mut next = (*settings).clone();
            next.api_url = api_url.trim().to_string();
            persist(KEY_API_URL, next.api_url.clone(), toast.clone());
            settings.set(next);
        })
    };

    // Prompt

    let on_prompt_input = {
        let prompt_text = prompt_text.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(area) = e.target_dyn_into::<HtmlTextAreaElement>() {
                prompt_text.set(area.value());
            }
        })
    };

    let on_save_prompt = {
        let settings = settings.clone();
        let prompt_text = prompt_text.clone();
        let toast = toast.clone();
        Callback::from(move |_| {
            let missing = prompt::missing_placeholders(&prompt_text);
            if !missing.is_empty() {
                let names: Vec<String> = missing.iter().map(|m| format!("{{{{{}}}}}", m)).collect();
                toast.set(Some(ToastMessage::error(format!("Prompt must contain {}", names.join(", ")))));
                return;
            }
            let mut next = (*settings).clone();
            next.prompt = (*prompt_text).clone();
            persist(KEY_PROMPT, next.prompt.clone(), toast.clone());
            settings.set(next);
            toast.set(Some(ToastMessage::success("Prompt saved")));
        })
    };

    // Filter rules

    let on_add_rule = {
        let settings = settings.clone();
        let toast = toast.clone();
        Callback::from(move |_| {
            let mut next = (*settings).clone();
            next.filter_rules
                .push(FilterRuleItem::new(js_sys::Date::now(), RuleType::Domain, ""));
            persist(KEY_FILTER_RULES, next.filter_rules.clone(), toast.clone());
            settings.set(next);
        })
    };

    let on_rule_type = {
        let settings = settings.clone();
        let toast = toast.clone();
        move |id: f64| {
            let settings = settings.clone();
            let toast = toast.clone();
            Callback::from(move |e: Event| {
                let Some(rule_type) = select_value(&e)
                    .and_then(|v| v.parse::<usize>().ok())
                    .and_then(|i| RuleType::EDITABLE.get(i).cloned())
                else {
                    return;
                };
                let mut next = (*settings).clone();
                if let Some(item) = next.filter_rules.iter_mut().find(|r| r.id == id) {
                    item.rule_type = rule_type;
                }
                persist(KEY_FILTER_RULES, next.filter_rules.clone(), toast.clone());
                settings.set(next);
            })
        }
    };

    let on_rule_text = {
        let settings = settings.clone();
        let toast = toast.clone();
        move |id: f64| {
            let settings = settings.clone();
            let toast = toast.clone();
            Callback::from(move |e: Event| {
                let Some(text) = input_value(&e) else { return };
                let mut next = (*settings).clone();
                if let Some(item) = next.filter_rules.iter_mut().find(|r| r.id == id) {
                    item.rule = text.trim().to_string();
                }
                persist(KEY_FILTER_RULES, next.filter_rules.clone(), toast.clone());
                settings.set(next);
            })
        }
    };

    let on_delete_rule = {
        let settings = settings.clone();
        let toast = toast.clone();
        move |id: f64| {
            let settings = settings.clone();
            let toast = toast.clone();
            Callback::from(move |_| {
                let mut next = (*settings).clone();
                next.filter_rules.retain(|r| r.id != id);
                persist(KEY_FILTER_RULES, next.filter_rules.clone(), toast.clone());
                settings.set(next);
            })
        }
    };

    let colors_enabled = settings.colors_enabled;

    html! {
        <div class="padding-20 options-page">
            <h1 class="popup-title">{"Tab Grouper Options"}</h1>

            <Toast toast={toast.clone()} />

            <section class="options-section">
                <h2 class="stats-title">{"Categories"}</h2>
                <div class="stats-box">
                    {for settings.types.iter().enumerate().map(|(index, category)| {
                        let color = settings.color_for(category);
                        html! {
                            <div class="stat-item" key={category.clone()}>
                                if colors_enabled {
                                    <select onchange={on_color(index)}>
                                        <option value="" selected={color.is_none()} disabled={true}>{"Color"}</option>
                                        {for TabColor::ALL.iter().map(|c| html! {
                                            <option
                                                value={c.name()}
                                                selected={color == Some(*c)}
                                                style={format!("background-color: {}", c.swatch())}
                                            >
                                                {c.name()}
                                            </option>
                                        })}
                                    </select>
                                }
                                <input
                                    class="pf-v5-c-form-control"
                                    value={category.clone()}
                                    onchange={on_rename(category.clone())}
                                />
                                <Button onclick={on_delete(index)} variant={ButtonVariant::Plain}>
                                    {"✕"}
                                </Button>
                            </div>
                        }
                    })}
                </div>
                <div class="key-row">
                    <input
                        class="pf-v5-c-form-control"
                        placeholder="New category"
                        value={(*new_category).clone()}
                        oninput={on_new_category_input}
                    />
                    <Button onclick={on_add_category} variant={ButtonVariant::Secondary}>
                        {"Add"}
                    </Button>
                </div>
                <CheckboxRow
                    label="Color groups by category"
                    checked={colors_enabled}
                    onchange={on_colors_enabled}
                />
                <CheckboxRow
                    label="Move groups to the end of the tab strip"
                    checked={settings.is_auto_position}
                    onchange={on_auto_position}
                />
            </section>

            <section class="options-section">
                <h2 class="stats-title">{"Provider"}</h2>
                <select onchange={on_provider}>
                    {for ServiceProvider::ALL.iter().map(|p| html! {
                        <option value={p.label()} selected={settings.service_provider == *p}>
                            {p.label()}
                        </option>
                    })}
                </select>
                if settings.service_provider == ServiceProvider::Gpt {
                    <input
                        class="pf-v5-c-form-control"
                        placeholder={DEFAULT_MODEL}
                        value={settings.model.clone()}
                        onchange={on_model}
                    />
                }
                if settings.service_provider.uses_api_url() {
                    <input
                        class="pf-v5-c-form-control"
                        placeholder={DEFAULT_API_URL}
                        value={settings.api_url.clone()}
                        onchange={on_api_url}
                    />
                }
            </section>

            <section class="options-section">
                <h2 class="stats-title">{"Prompt"}</h2>
                <textarea
                    class="pf-v5-c-form-control"
                    rows="6"
                    value={(*prompt_text).clone()}
                    oninput={on_prompt_input}
                />
                <p class="message-text">{"Use {{tabURL}}, {{tabTitle}} and {{types}} in the prompt."}</p>
                <Button onclick={on_save_prompt} variant={ButtonVariant::Secondary}>
                    {"Save prompt"}
                </Button>
            </section>

            <section class="options-section">
                <h2 class="stats-title">{"Filter rules"}</h2>
                <p class="message-text">{"Tabs matching a rule are never grouped automatically."}</p>
                <div class="stats-box">
                    {for settings.filter_rules.iter().map(|item| {
                        let selected = RuleType::EDITABLE.iter().position(|t| *t == item.rule_type);
                        html! {
                            <div class="stat-item" key={item.id.to_string()}>
                                <select onchange={on_rule_type(item.id)}>
                                    {for RuleType::EDITABLE.iter().enumerate().map(|(i, t)| html! {
                                        <option value={i.to_string()} selected={selected == Some(i)}>
                                            {t.label()}
                                        </option>
                                    })}
                                </select>
                                <input
                                    class="pf-v5-c-form-control"
                                    value={item.rule.clone()}
                                    onchange={on_rule_text(item.id)}
                                />
                                <Button onclick={on_delete_rule(item.id)} variant={ButtonVariant::Plain}>
                                    {"✕"}
                                </Button>
                            </div>
                        }
                    })}
                </div>
                <Button onclick={on_add_rule} variant={ButtonVariant::Secondary}>
                    {"Add rule"}
                </Button>
            </section>
        </div>
    }
}
