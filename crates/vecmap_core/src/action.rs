//! 动作策略接口。

use tracing::{debug, info_span, warn};

use crate::capability::CapabilityDeclaration;
use crate::context::{ActionEnv, ClickContext};
use crate::error::ActionError;
use crate::settings::ActionSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// 用户取消了对话框，没有任何修改。
    Cancelled,
}

pub trait MapAction: Send + Sync {
    fn declaration(&self) -> CapabilityDeclaration;

    /// 执行动作本体。设置读取器按本动作的 id 与设置表构造。
    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError>;

    /// 运行并把错误转成通知；结果原样返回给调用方，调度器不据此分支。
    fn execute(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let decl = self.declaration();
        let store = env.settings;
        let namespace = env.namespace;
        let settings =
            ActionSettings::new(store, namespace, &decl.action_id).with_schema(&decl.settings);

        let span = info_span!("action", action_id = %decl.action_id);
        let _enter = span.enter();

        let result = self.run(ctx, env, &settings);
        match &result {
            Ok(outcome) => debug!(?outcome, "action finished"),
            Err(err) => {
                warn!(%err, "action failed");
                env.notifier.show(err.level(), err.title(), &err.to_string());
            }
        }
        result
    }
}
