/// Reusable UI components

use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::provider::KeyCheck;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ToastKind {
    Success,
    Warning,
    Error,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ToastMessage {
    pub kind: ToastKind,
    pub text: String,
}

impl ToastMessage {
    pub fn success(text: impl Into<String>) -> Self {
        ToastMessage { kind: ToastKind::Success, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        ToastMessage { kind: ToastKind::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ToastMessage { kind: ToastKind::Error, text: text.into() }
    }
}

impl From<KeyCheck> for ToastMessage {
    fn from(check: KeyCheck) -> Self {
        match check {
            KeyCheck::Valid => ToastMessage::success("API key is valid"),
            KeyCheck::Unverified(reason) => ToastMessage::warning(format!("Saved, but could not verify the key: {}", reason)),
            KeyCheck::Invalid(reason) => ToastMessage::error(reason),
        }
    }
}

const TOAST_MILLIS: i32 = 3000;

#[derive(Properties, PartialEq)]
pub struct ToastProps {
    pub toast: UseStateHandle<Option<ToastMessage>>,
}

/// Inline alert that clears itself after a few seconds
#[function_component(Toast)]
pub fn toast(props: &ToastProps) -> Html {
    {
        let toast = props.toast.clone();
        use_effect_with((*props.toast).clone(), move |current| {
            if current.is_some() {
                let clear = Closure::once_into_js(move || toast.set(None));
                if let Some(window) = web_sys::window() {
                    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                        clear.unchecked_ref(),
                        TOAST_MILLIS,
                    );
                }
            }
            || ()
        });
    }

    match &*props.toast {
        None => html! {},
        Some(message) => {
            let (alert_type, title) = match message.kind {
                ToastKind::Success => (AlertType::Success, "Success"),
                ToastKind::Warning => (AlertType::Warning, "Warning"),
                ToastKind::Error => (AlertType::Danger, "Error"),
            };
            html! {
                <div class="toast">
                    <Alert r#type={alert_type} title={title.to_string()} inline={true}>
                        {message.text.clone()}
                    </Alert>
                </div>
            }
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct CheckboxRowProps {
    pub label: AttrValue,
    pub checked: bool,
    pub onchange: Callback<bool>,
    #[prop_or(false)]
    pub disabled: bool,
}

/// Labelled checkbox reporting its new state
#[function_component(CheckboxRow)]
pub fn checkbox_row(props: &CheckboxRowProps) -> Html {
    let onchange = {
        let onchange = props.onchange.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                onchange.emit(input.checked());
            }
        })
    };

    html! {
        <label class="checkbox-row">
            <input
                type="checkbox"
                checked={props.checked}
                disabled={props.disabled}
                onchange={onchange}
            />
            <span class="checkbox-label">{props.label.clone()}</span>
        </label>
    }
}
